use std::cell::Cell;
use std::fmt;

use smol_str::SmolStr;

/// Coroutine status as reported to scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoroutineStatus {
    Suspended,
    Running,
    Normal,
    Dead,
}

impl CoroutineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CoroutineStatus::Suspended => "suspended",
            CoroutineStatus::Running => "running",
            CoroutineStatus::Normal => "normal",
            CoroutineStatus::Dead => "dead",
        }
    }
}

/// Thread handle. Scheduling lives with the coroutine collaborator; the
/// core only needs identity and a status cell.
pub struct LuaThread {
    name: SmolStr,
    status: Cell<CoroutineStatus>,
}

impl LuaThread {
    pub fn new(name: &str) -> Self {
        LuaThread {
            name: SmolStr::new(name),
            status: Cell::new(CoroutineStatus::Suspended),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> CoroutineStatus {
        self.status.get()
    }

    pub fn set_status(&self, status: CoroutineStatus) {
        self.status.set(status);
    }
}

impl fmt::Debug for LuaThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LuaThread({}, {})", self.name, self.status().as_str())
    }
}
