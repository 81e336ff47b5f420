use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::application::view::{Notice, Notifier};

const MAX_NOTICES: usize = 32;

/// 表示時間を過ぎた通知を自動で捨てるNotifier実装。
#[derive(Debug)]
pub struct NoticeLog {
    duration: Duration,
    entries: VecDeque<(Instant, Notice)>,
}

impl NoticeLog {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            entries: VecDeque::new(),
        }
    }

    /// 指定時刻時点で表示中の通知
    pub fn active_at(&mut self, now: Instant) -> Vec<Notice> {
        self.expire(now);
        self.entries.iter().map(|(_, n)| n.clone()).collect()
    }

    fn expire(&mut self, now: Instant) {
        while let Some((shown_at, _)) = self.entries.front() {
            if now.saturating_duration_since(*shown_at) >= self.duration {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Notifier for NoticeLog {
    fn notify(&mut self, notice: Notice) {
        if self.entries.len() == MAX_NOTICES {
            self.entries.pop_front();
        }
        self.entries.push_back((Instant::now(), notice));
    }

    fn active(&mut self) -> Vec<Notice> {
        self.active_at(Instant::now())
    }
}
