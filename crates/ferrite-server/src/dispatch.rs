//! Command dispatch.
//!
//! Executes one decoded [`Request`] against the shared keyspace and produces
//! the wire [`Response`]. The batch engines live here too: MGET and MSET map
//! over their pre-decoded payloads, and PIPELINE re-enters the single-command
//! executor for each embedded slot, answering malformed slots in position.
//!
//! All commands in one exchange share a single `now`, so a pipeline observes
//! one consistent clock.

use bytes::Bytes;
use ferrite_core::{Keyspace, TtlResult};
use ferrite_protocol::response::{
    encode_array, encode_entries, encode_mget, encode_pipeline, encode_scan,
};
use ferrite_protocol::{ProtocolError, Request, Response, SetEntry};

use crate::stats::ServerStats;

/// Fixed SCAN page size. The cursor is an index into a sorted snapshot, so
/// the batch size is a server-side constant rather than a wire parameter.
const SCAN_BATCH: usize = 10;

/// Executes a request and returns its response.
///
/// Counts one operation per command; a pipeline counts each embedded
/// command instead of the wrapper.
pub fn dispatch(req: Request, keyspace: &Keyspace, stats: &ServerStats, now: i64) -> Response {
    match &req {
        Request::Pipeline { commands } => stats.add_total_ops(commands.len() as u64),
        _ => stats.add_total_ops(1),
    }
    execute(req, keyspace, stats, now)
}

fn execute(req: Request, keyspace: &Keyspace, stats: &ServerStats, now: i64) -> Response {
    match req {
        Request::Set { key, ttl, value } => {
            stats.record_set();
            match keyspace.set_string(key, value, ttl, now) {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(e.to_string()),
            }
        }

        Request::Get { key } => {
            stats.record_get();
            match keyspace.get_string(&key, now) {
                Ok(Some(value)) => {
                    stats.record_hit();
                    Response::with_data(value)
                }
                Ok(None) => {
                    stats.record_miss();
                    Response::not_found()
                }
                Err(e) => Response::error(e.to_string()),
            }
        }

        Request::Del { key } => {
            stats.record_del();
            Response::integer(i64::from(keyspace.delete(&key, now)))
        }

        Request::Exists { key } => Response::integer(i64::from(keyspace.exists(&key, now))),

        Request::Expire { key, ttl } => {
            Response::integer(i64::from(keyspace.expire(&key, ttl, now)))
        }

        Request::Ttl { key } => match keyspace.ttl(&key, now) {
            TtlResult::Seconds(secs) => Response::integer(secs),
            TtlResult::NoExpiry => Response::integer(-1),
            TtlResult::NotFound => Response::integer(-2),
        },

        Request::Incr { key } => match keyspace.incr_by(&key, 1, now) {
            Ok(value) => Response::integer(value),
            Err(e) => Response::error(e.to_string()),
        },

        Request::Decr { key } => match keyspace.incr_by(&key, -1, now) {
            Ok(value) => Response::integer(value),
            Err(e) => Response::error(e.to_string()),
        },

        Request::GetSet { key, value } => match keyspace.get_set(&key, value, now) {
            Ok(Some(old)) => Response::with_data(old),
            Ok(None) => Response::not_found(),
            Err(e) => Response::error(e.to_string()),
        },

        Request::LPush { key, value } => match keyspace.list_push(&key, value, true, now) {
            Ok(len) => Response::integer(len as i64),
            Err(e) => Response::error(e.to_string()),
        },

        Request::RPush { key, value } => match keyspace.list_push(&key, value, false, now) {
            Ok(len) => Response::integer(len as i64),
            Err(e) => Response::error(e.to_string()),
        },

        Request::LPop { key } => match keyspace.list_pop(&key, true, now) {
            Ok(Some(value)) => Response::with_data(value),
            Ok(None) => Response::not_found(),
            Err(e) => Response::error(e.to_string()),
        },

        Request::RPop { key } => match keyspace.list_pop(&key, false, now) {
            Ok(Some(value)) => Response::with_data(value),
            Ok(None) => Response::not_found(),
            Err(e) => Response::error(e.to_string()),
        },

        Request::LLen { key } => match keyspace.list_len(&key, now) {
            Ok(len) => Response::integer(len as i64),
            Err(e) => Response::error(e.to_string()),
        },

        Request::LIndex { key, index } => match keyspace.list_index(&key, index as usize, now) {
            Ok(Some(value)) => Response::with_data(value),
            Ok(None) => Response::not_found(),
            Err(e) => Response::error(e.to_string()),
        },

        Request::LRange { key, start, end } => {
            match keyspace.list_range(&key, start as usize, end as usize, now) {
                Ok(items) => Response::with_data(encode_array(&items)),
                Err(e) => Response::error(e.to_string()),
            }
        }

        Request::SAdd { key, member } => match keyspace.set_add(&key, member, now) {
            Ok(added) => Response::integer(i64::from(added)),
            Err(e) => Response::error(e.to_string()),
        },

        Request::SRem { key, member } => match keyspace.set_remove(&key, &member, now) {
            Ok(removed) => Response::integer(i64::from(removed)),
            Err(e) => Response::error(e.to_string()),
        },

        Request::SMembers { key } => match keyspace.set_members(&key, now) {
            Ok(members) => Response::with_data(encode_array(&members)),
            Err(e) => Response::error(e.to_string()),
        },

        Request::SCard { key } => match keyspace.set_card(&key, now) {
            Ok(card) => Response::integer(card as i64),
            Err(e) => Response::error(e.to_string()),
        },

        Request::SIsMember { key, member } => match keyspace.set_contains(&key, &member, now) {
            Ok(present) => Response::integer(i64::from(present)),
            Err(e) => Response::error(e.to_string()),
        },

        Request::HSet { key, field, value } => match keyspace.hash_set(&key, field, value, now) {
            Ok(created) => Response::integer(i64::from(created)),
            Err(e) => Response::error(e.to_string()),
        },

        Request::HGet { key, field } => match keyspace.hash_get(&key, &field, now) {
            Ok(Some(value)) => Response::with_data(value),
            Ok(None) => Response::not_found(),
            Err(e) => Response::error(e.to_string()),
        },

        Request::HDel { key, field } => match keyspace.hash_del(&key, &field, now) {
            Ok(removed) => Response::integer(i64::from(removed)),
            Err(e) => Response::error(e.to_string()),
        },

        Request::HGetAll { key } => match keyspace.hash_entries(&key, now) {
            Ok(entries) => Response::with_data(encode_entries(&entries)),
            Err(e) => Response::error(e.to_string()),
        },

        Request::HLen { key } => match keyspace.hash_len(&key, now) {
            Ok(len) => Response::integer(len as i64),
            Err(e) => Response::error(e.to_string()),
        },

        Request::HExists { key, field } => match keyspace.hash_contains(&key, &field, now) {
            Ok(present) => Response::integer(i64::from(present)),
            Err(e) => Response::error(e.to_string()),
        },

        Request::Keys { pattern } => {
            Response::with_data(encode_array(&keyspace.keys(&pattern, now)))
        }

        Request::Scan { cursor, pattern } => {
            let (next_cursor, keys) = keyspace.scan(cursor, &pattern, SCAN_BATCH, now);
            Response::with_data(encode_scan(next_cursor, &keys))
        }

        Request::MGet { keys } => mget(&keys, keyspace, now),

        Request::MSet { entries } => mset(entries, keyspace, now),

        Request::Pipeline { commands } => pipeline(commands, keyspace, stats, now),

        Request::Unknown(_) => Response::error("Unknown command"),
    }
}

/// MGET: each key is loaded (and lazily expired) independently. A missing
/// key, an expired key, or a key of the wrong type all report the nil
/// sentinel rather than an error.
fn mget(keys: &[Bytes], keyspace: &Keyspace, now: i64) -> Response {
    let values: Vec<Option<Bytes>> = keys
        .iter()
        .map(|key| keyspace.get_string(key, now).ok().flatten())
        .collect();
    Response::with_data(encode_mget(&values))
}

/// MSET: applies each triple as a SET and answers with the count of pairs
/// applied. The decoder validated the whole payload before we got here, so
/// the only pairs that can fail are those targeting a live key of another
/// type; they are skipped and excluded from the count.
fn mset(entries: Vec<SetEntry>, keyspace: &Keyspace, now: i64) -> Response {
    let mut applied: i64 = 0;
    for entry in entries {
        if keyspace
            .set_string(entry.key, entry.value, entry.ttl, now)
            .is_ok()
        {
            applied += 1;
        }
    }
    Response::integer(applied)
}

/// PIPELINE: executes each slot in order and embeds the responses verbatim.
/// Slots that failed to decode answer with their error in position.
fn pipeline(
    commands: Vec<Result<Request, ProtocolError>>,
    keyspace: &Keyspace,
    stats: &ServerStats,
    now: i64,
) -> Response {
    let responses: Vec<Response> = commands
        .into_iter()
        .map(|slot| match slot {
            Ok(req) => execute(req, keyspace, stats, now),
            Err(e) => Response::error(e.to_string()),
        })
        .collect();
    Response::with_data(encode_pipeline(&responses))
}
