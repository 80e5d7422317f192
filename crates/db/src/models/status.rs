//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

use auditdesk_core::progress::CompletionStatus;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Manual completion of a substep (`substep_completion_statuses`).
    SubstepCompletionStatus {
        NotStarted = 1,
        Completed = 2,
    }
}

impl From<CompletionStatus> for SubstepCompletionStatus {
    fn from(value: CompletionStatus) -> Self {
        match value {
            CompletionStatus::NotStarted => SubstepCompletionStatus::NotStarted,
            CompletionStatus::Completed => SubstepCompletionStatus::Completed,
        }
    }
}
