//! 内存中的会话记录：Turn 数组 + 事件 id 到 Turn 下标的二级索引
//!
//! 同一个事件可能同时出现在 create_event 的单个载荷与 list_events 的列表载荷中；
//! 生命周期操作通过索引直接定位所有副本，无需每次扫描全部 Turn。

use std::collections::{BTreeSet, HashMap};

use super::session::{ChatSession, Turn};
use crate::store::EventStatus;

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    session: ChatSession,
    /// event id -> 引用该事件的 Turn 下标
    event_index: HashMap<String, BTreeSet<usize>>,
}

impl Transcript {
    pub fn new(session: ChatSession) -> Self {
        let mut transcript = Self {
            session,
            event_index: HashMap::new(),
        };
        transcript.rebuild_index();
        transcript
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn into_session(self) -> ChatSession {
        self.session
    }

    pub fn assign_title(&mut self, title: impl Into<String>) -> bool {
        self.session.assign_title(title)
    }

    pub fn push(&mut self, turn: Turn) -> usize {
        let ids: Vec<String> = turn
            .payload
            .as_ref()
            .map(|p| p.event_ids().into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        let index = self.session.push(turn);
        for id in ids {
            self.event_index.entry(id).or_default().insert(index);
        }
        index
    }

    /// 引用该事件的 Turn 下标（升序）
    pub fn turns_referencing(&self, event_id: &str) -> Vec<usize> {
        self.event_index
            .get(event_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// 修补所有嵌入副本的状态；返回修补的副本数
    pub fn relabel_event(&mut self, event_id: &str, status: EventStatus) -> usize {
        let Some(indices) = self.event_index.get(event_id) else {
            return 0;
        };
        let mut patched = 0;
        for &i in indices {
            if let Some(payload) = self.session.turn_mut(i).and_then(|t| t.payload.as_mut()) {
                patched += payload.relabel_event(event_id, status);
            }
        }
        patched
    }

    /// 嵌入副本中记录的状态（取最近引用它的 Turn）
    pub fn embedded_status(&self, event_id: &str) -> Option<EventStatus> {
        let last = *self.event_index.get(event_id)?.iter().next_back()?;
        self.session.turns()[last]
            .payload
            .as_ref()
            .and_then(|p| p.event_status(event_id))
    }

    fn rebuild_index(&mut self) {
        self.event_index.clear();
        for (i, turn) in self.session.turns().iter().enumerate() {
            if let Some(payload) = &turn.payload {
                for id in payload.event_ids() {
                    self.event_index.entry(id.to_string()).or_default().insert(i);
                }
            }
        }
    }
}
