//! Leadflow Data Model
//!
//! Typed records shared by every leadflow crate.
//!
//! # Core Concepts
//!
//! - [`User`] / [`Role`]: the actor and what the actor is allowed to see
//! - [`Group`] / [`GroupRoster`]: named collections of users with one leader
//! - [`Prospect`]: the workflow entity; its stage is derived from [`Progress`]
//! - [`BadgeTier`]: point thresholds for progress display
//! - [`Event`]: announcements targeted at groups
//!
//! # Example
//!
//! ```rust,ignore
//! use leadflow_model::{Contact, PhoneNumber, Prospect, Stage};
//!
//! let contact = Contact::new("Ali Baba", PhoneNumber::from_suffix("123456789")?);
//! let prospect = Prospect::new("p-1".into(), "agent-a".into(), contact);
//! assert_eq!(prospect.current_stage(), Stage::Prospect);
//! ```

#![warn(unreachable_pub)]

mod badge;
mod error;
mod event;
mod ids;
mod prospect;
mod user;

pub use badge::BadgeTier;
pub use error::ModelError;
pub use event::Event;
pub use ids::{EventId, GroupId, ProspectId, UserId};
pub use prospect::{
    Appointment, AppointmentStatus, AppointmentStep, Contact, MeetingPart, MeetingParts, Outcome,
    PhoneNumber, ProductLines, Progress, Prospect, ProspectProduct, SalesOutcome, Stage,
    UnsuccessfulReason,
};
pub use user::{Group, GroupRoster, Role, User};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default product catalog offered by the outcome step.
///
/// Free-text product names are accepted as well.
pub const DEFAULT_PRODUCT_CATALOG: &[&str] = &[
    "Takaful Term80",
    "Medical Card",
    "Investment-Linked Plan",
    "Education Plan",
    "Retirement Plan",
];

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the data model
    pub use crate::{
        Appointment, AppointmentStatus, Contact, GroupId, MeetingPart, Outcome, PhoneNumber,
        Progress, Prospect, ProspectId, ProspectProduct, Role, SalesOutcome, Stage, User, UserId,
    };
}
