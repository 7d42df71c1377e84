//! Callback routes
//!
//! Hook paths embedded in verbs. The control layer names one of these in
//! every hook frame, which is how a frame finds its handler.

/// A callback route a call can receive events on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Mid-conversation LLM events
    ConversationEvent,
    /// LLM conversation finished or failed
    Completion,
    /// LLM requested a tool
    ToolInvocation,
    /// Transfer leg ended
    DialOutcome,
    /// Transfer leg answered, before bridging
    Confirmation,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::ConversationEvent,
        Route::Completion,
        Route::ToolInvocation,
        Route::DialOutcome,
        Route::Confirmation,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::ConversationEvent => "/event",
            Route::Completion => "/final",
            Route::ToolInvocation => "/toolCall",
            Route::DialOutcome => "/dialAction",
            Route::Confirmation => "/confirmAction",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }
}
