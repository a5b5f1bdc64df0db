//! Lua scripts for Redis locks.

/// Delete a lock only if the caller still owns it.
///
/// Arguments:
/// - KEYS[1]: Lock key (e.g., `room:{id}:start`)
/// - ARGV[1]: Owner token
///
/// Returns:
/// - 1: Released
/// - 0: Not held by this token (expired or taken over)
pub const COMPARE_AND_DELETE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
"#;
