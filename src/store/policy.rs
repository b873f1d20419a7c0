//! Write Policies
//!
//! Three immutable write policies cover every upsert semantic the commands
//! need. They are built once at startup and handed to each connection's
//! [`Context`](crate::context::Context); nothing mutates them afterwards.

/// How a write treats an existing (or missing) record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordExistsAction {
    /// Create the record if missing, otherwise update it.
    #[default]
    Update,
    /// Fail with `KeyNotFound` if the record is missing.
    UpdateOnly,
    /// Fail with `KeyExists` if the record is present.
    CreateOnly,
}

/// Options applied to a single write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePolicy {
    /// Store the user key alongside the record.
    pub send_key: bool,
    pub record_exists_action: RecordExistsAction,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            send_key: true,
            record_exists_action: RecordExistsAction::Update,
        }
    }
}

impl WritePolicy {
    fn with_action(record_exists_action: RecordExistsAction) -> Self {
        Self {
            record_exists_action,
            ..Self::default()
        }
    }
}

/// The write policies shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policies {
    pub default: WritePolicy,
    pub create_only: WritePolicy,
    pub update_only: WritePolicy,
}

impl Policies {
    pub fn new() -> Self {
        Self {
            default: WritePolicy::default(),
            create_only: WritePolicy::with_action(RecordExistsAction::CreateOnly),
            update_only: WritePolicy::with_action(RecordExistsAction::UpdateOnly),
        }
    }
}

impl Default for Policies {
    fn default() -> Self {
        Self::new()
    }
}
