//! Protected routes behind a connected session.
//!
//! `/quest` is the quest overview; every onboarding task plugin gets
//! `task/{PluginDefinitionType}/{taskId}` below it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginDefinitionType {
    OnboardingOpenTaskPlugin,
    OnboardingQuizTaskPlugin,
    OnboardingJoinDiscordTaskPlugin,
    OnboardingTransactionTaskPlugin,
}

impl PluginDefinitionType {
    pub const TASKS: [PluginDefinitionType; 4] = [
        PluginDefinitionType::OnboardingOpenTaskPlugin,
        PluginDefinitionType::OnboardingQuizTaskPlugin,
        PluginDefinitionType::OnboardingJoinDiscordTaskPlugin,
        PluginDefinitionType::OnboardingTransactionTaskPlugin,
    ];

    /// Path segment, identical to the variant name.
    pub fn as_str(self) -> &'static str {
        match self {
            PluginDefinitionType::OnboardingOpenTaskPlugin => "OnboardingOpenTaskPlugin",
            PluginDefinitionType::OnboardingQuizTaskPlugin => "OnboardingQuizTaskPlugin",
            PluginDefinitionType::OnboardingJoinDiscordTaskPlugin => {
                "OnboardingJoinDiscordTaskPlugin"
            }
            PluginDefinitionType::OnboardingTransactionTaskPlugin => {
                "OnboardingTransactionTaskPlugin"
            }
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::TASKS.into_iter().find(|p| p.as_str() == segment)
    }

    pub fn title(self) -> &'static str {
        match self {
            PluginDefinitionType::OnboardingOpenTaskPlugin => "Open task",
            PluginDefinitionType::OnboardingQuizTaskPlugin => "Quiz",
            PluginDefinitionType::OnboardingJoinDiscordTaskPlugin => "Join Discord",
            PluginDefinitionType::OnboardingTransactionTaskPlugin => "Transaction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Quest,
    Task {
        plugin: PluginDefinitionType,
        task_id: String,
    },
}

impl Route {
    /// Accepts paths with or without the `/quest` prefix. Anything that is
    /// not in the table yields `None`.
    pub fn parse(path: &str) -> Option<Route> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        if segments.peek() == Some(&"quest") {
            segments.next();
        }
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (None, ..) => Some(Route::Quest),
            (Some("task"), Some(plugin), Some(task_id), None) => Some(Route::Task {
                plugin: PluginDefinitionType::from_segment(plugin)?,
                task_id: task_id.to_owned(),
            }),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Quest => "/quest".to_owned(),
            Route::Task { plugin, task_id } => {
                format!("/quest/task/{}/{task_id}", plugin.as_str())
            }
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
