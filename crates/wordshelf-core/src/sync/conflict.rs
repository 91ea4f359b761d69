//! Last-writer-wins conflict resolution

/// Outcome of comparing a local record with an incoming remote one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KeepLocal,
    TakeRemote,
}

/// Decide which whole record survives
///
/// A local record without unconfirmed edits never blocks the remote one.
/// Otherwise the strictly later `updated_at` wins and a tie goes to local.
pub const fn resolve(
    local_needs_sync: Option<bool>,
    local_updated_at: i64,
    remote_updated_at: i64,
) -> Resolution {
    match local_needs_sync {
        None | Some(false) => Resolution::TakeRemote,
        Some(true) if remote_updated_at > local_updated_at => Resolution::TakeRemote,
        Some(true) => Resolution::KeepLocal,
    }
}
