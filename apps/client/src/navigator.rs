/// One-time messages shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SessionExpired,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::SessionExpired => "Your session has expired. Please sign in again.",
        }
    }
}

/// Whatever owns the screen: shows notices and changes location.
pub trait Navigator: Send + Sync {
    fn notify(&self, notice: Notice);
    fn redirect(&self, path: &str);
}
