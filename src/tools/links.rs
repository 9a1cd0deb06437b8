//! 深链构造：Google Calendar 模板、mailto、网页邮箱撰写页

use chrono::Duration;

use crate::store::CalendarEvent;

const GCAL_BASE: &str = "https://calendar.google.com/calendar/render";
const GMAIL_COMPOSE: &str = "https://mail.google.com/mail/";

/// 日历模板链接：开始 = date+time（UTC），结束 = 开始 + 1 小时；日期或时间无法解析时为 None
pub fn calendar_link(event: &CalendarEvent) -> Option<String> {
    let start = event.starts_at()?;
    let end = start + Duration::hours(1);
    let fmt = "%Y%m%dT%H%M%SZ";
    Some(format!(
        "{}?action=TEMPLATE&text={}&dates={}/{}&details={}",
        GCAL_BASE,
        urlencoding::encode(&event.title),
        start.format(fmt),
        end.format(fmt),
        urlencoding::encode(&event.description),
    ))
}

/// mailto 链接；正文换行先统一为 CRLF 再编码
pub fn mailto_link(to: &str, subject: &str, body: &str) -> String {
    let crlf = body.replace("\r\n", "\n").replace('\n', "\r\n");
    format!(
        "mailto:{}?subject={}&body={}",
        to,
        urlencoding::encode(subject),
        urlencoding::encode(&crlf),
    )
}

pub fn gmail_link(to: &str, subject: &str, body: &str) -> String {
    format!(
        "{}?view=cm&fs=1&to={}&su={}&body={}",
        GMAIL_COMPOSE,
        urlencoding::encode(to),
        urlencoding::encode(subject),
        urlencoding::encode(body),
    )
}
