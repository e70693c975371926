//! Structured audit logging for league mutations.
//!
//! Every committed score, result, walkover, fixture and bracket change is
//! logged under the `audit` target so it can be routed separately.

use crate::db::models::{MatchStatus, Side};

/// Log a set written by a referee
pub fn log_set_recorded(match_id: i64, set_number: i64, points_a: i64, points_b: i64, status: MatchStatus) {
    tracing::info!(
        target: "audit",
        event = "set_recorded",
        match_id = match_id,
        set_number = set_number,
        points_a = points_a,
        points_b = points_b,
        status = status.as_str(),
        "Set {} of match {} recorded {}-{} ({})",
        set_number,
        match_id,
        points_a,
        points_b,
        status
    );
}

/// Log a set removal
pub fn log_set_deleted(set_id: i64, match_id: i64, reverted: bool) {
    tracing::info!(
        target: "audit",
        event = "set_deleted",
        set_id = set_id,
        match_id = match_id,
        reverted = reverted,
        "Set {} deleted from match {} (stats reverted: {})",
        set_id,
        match_id,
        reverted
    );
}

/// Log an administrative result overwrite
pub fn log_result_committed(match_id: i64, user_id: i64, sets_a: i64, sets_b: i64) {
    tracing::info!(
        target: "audit",
        event = "result_committed",
        match_id = match_id,
        user_id = user_id,
        sets_a = sets_a,
        sets_b = sets_b,
        "Result of match {} set to {}-{} by user {}",
        match_id,
        sets_a,
        sets_b,
        user_id
    );
}

/// Log a forced walkover
pub fn log_walkover(match_id: i64, user_id: i64, absent: Side) {
    tracing::info!(
        target: "audit",
        event = "walkover",
        match_id = match_id,
        user_id = user_id,
        absent_side = absent.as_str(),
        "Match {} finalized by walkover, side {} absent (user {})",
        match_id,
        absent,
        user_id
    );
}

/// Log a fixture generation
pub fn log_fixture_generated(level_id: i64, user_id: i64, created: usize) {
    tracing::info!(
        target: "audit",
        event = "fixture_generated",
        level_id = level_id,
        user_id = user_id,
        created = created,
        "Fixture for level {} generated {} matches (user {})",
        level_id,
        created,
        user_id
    );
}

/// Log a bracket event (final created/retargeted, champion stamped or revoked)
pub fn log_bracket_event(level_id: i64, event: &str, details: &str) {
    tracing::info!(
        target: "audit",
        event = "bracket",
        level_id = level_id,
        bracket_event = event,
        details = details,
        "Level {}: {} - {}",
        level_id,
        event,
        details
    );
}

/// Log a login attempt or account change
pub fn log_auth_event(username: &str, event: &str, success: bool) {
    if success {
        tracing::info!(
            target: "audit",
            event = event,
            username = username,
            success = success,
            "Auth event '{}' for user {}",
            event,
            username
        );
    } else {
        tracing::warn!(
            target: "audit",
            event = event,
            username = username,
            success = success,
            "Auth event '{}' failed for user {}",
            event,
            username
        );
    }
}
