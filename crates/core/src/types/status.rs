//! Order status and its transition rules.

use serde::{Deserialize, Serialize};

/// Errors returned when a status change is not allowed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusTransitionError {
    /// The requested target cannot be reached from the current status.
    #[error("cannot change order status from {from} to {to}")]
    NotAllowed {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
    /// The input did not name a known status.
    #[error("invalid order status: {0}")]
    Unknown(String),
}

/// Lifecycle status of a placed order.
///
/// Orders are created as `New`. Staff may move a new order to exactly one
/// of the terminal states; terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    Accepted,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::New, Self::Accepted, Self::Completed, Self::Cancelled];

    /// Statuses whose order totals count as revenue.
    pub const REVENUE: [Self; 2] = [Self::Accepted, Self::Completed];

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::New)
    }

    /// Whether an order in this status contributes to revenue.
    #[must_use]
    pub const fn counts_as_revenue(self) -> bool {
        matches!(self, Self::Accepted | Self::Completed)
    }

    /// Whether `self -> next` is a permitted transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::New, Self::Accepted | Self::Completed | Self::Cancelled)
        )
    }

    /// Validate a transition, returning the new status.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError::NotAllowed`] when the transition is
    /// not `New -> Accepted | Completed | Cancelled`.
    pub const fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError::NotAllowed {
                from: self,
                to: next,
            })
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Accepted => "Accepted",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Stable lowercase identifier, matching the database enum.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Accepted => "accepted",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusTransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "accepted" => Ok(Self::Accepted),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(StatusTransitionError::Unknown(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_can_reach_every_terminal_state() {
        for next in [
            OrderStatus::Accepted,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::New.transition_to(next), Ok(next));
        }
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        for from in [
            OrderStatus::Accepted,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert!(from.is_terminal());
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_new_to_new_is_rejected() {
        assert_eq!(
            OrderStatus::New.transition_to(OrderStatus::New),
            Err(StatusTransitionError::NotAllowed {
                from: OrderStatus::New,
                to: OrderStatus::New,
            })
        );
    }

    #[test]
    fn test_revenue_statuses() {
        let revenue: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.counts_as_revenue())
            .collect();
        assert_eq!(revenue, OrderStatus::REVENUE);
    }

    #[test]
    fn test_parse_roundtrips_display() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!(
            "Canceled".parse::<OrderStatus>().unwrap(),
            OrderStatus::Cancelled
        );
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
