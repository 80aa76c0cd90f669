use crate::types::{Priority, WorkItemKind, WorkItemStatus};
use crate::view_state::RowKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeStyle {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Gray,
}

impl BadgeStyle {
    pub fn class(self) -> &'static str {
        match self {
            BadgeStyle::Red => "bg-red-100 text-red-800",
            BadgeStyle::Orange => "bg-orange-100 text-orange-800",
            BadgeStyle::Yellow => "bg-yellow-100 text-yellow-800",
            BadgeStyle::Green => "bg-green-100 text-green-800",
            BadgeStyle::Blue => "bg-blue-100 text-blue-800",
            BadgeStyle::Purple => "bg-purple-100 text-purple-800",
            BadgeStyle::Gray => "bg-gray-100 text-gray-800",
        }
    }

    /// ANSI SGR colour code for terminal output.
    pub fn ansi(self) -> &'static str {
        match self {
            BadgeStyle::Red => "31",
            BadgeStyle::Orange => "33",
            BadgeStyle::Yellow => "93",
            BadgeStyle::Green => "32",
            BadgeStyle::Blue => "34",
            BadgeStyle::Purple => "35",
            BadgeStyle::Gray => "90",
        }
    }
}

pub fn priority_badge(priority: Priority) -> BadgeStyle {
    match priority {
        Priority::Critical => BadgeStyle::Red,
        Priority::High => BadgeStyle::Orange,
        Priority::Medium => BadgeStyle::Yellow,
        Priority::Low => BadgeStyle::Green,
    }
}

pub fn status_badge(status: &WorkItemStatus) -> BadgeStyle {
    match status {
        WorkItemStatus::Completed | WorkItemStatus::Approved => BadgeStyle::Green,
        WorkItemStatus::InProgress | WorkItemStatus::Active => BadgeStyle::Blue,
        WorkItemStatus::Planned => BadgeStyle::Purple,
        WorkItemStatus::InReview | WorkItemStatus::Submitted => BadgeStyle::Yellow,
        WorkItemStatus::OnHold => BadgeStyle::Orange,
        WorkItemStatus::Rejected | WorkItemStatus::Cancelled => BadgeStyle::Red,
        _ => BadgeStyle::Gray,
    }
}

pub const PORTFOLIO_COLOR: &str = "#8B4513";
pub const BRIEF_COLOR: &str = "#CD853F";

/// Accent colour of a tree row. Portfolios use their own colour when set.
pub fn type_color(kind: RowKind, portfolio_color: Option<&str>) -> &str {
    match kind {
        RowKind::Portfolio => portfolio_color
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(PORTFOLIO_COLOR),
        RowKind::Brief => BRIEF_COLOR,
        RowKind::Item(WorkItemKind::Initiative) => "#D4A843",
        RowKind::Item(WorkItemKind::Feature) => "#3B82F6",
        RowKind::Item(WorkItemKind::Epic) => "#8B5CF6",
        RowKind::Item(WorkItemKind::Story) => "#10B981",
    }
}
