//! The trust engine: vouches and join requests.
//!
//! A vouch is a signed attestation over (voucher, vouchee, channel,
//! timestamp); the composite primary key in the store makes double-vouching
//! a no-op. Saving a vouch recomputes the cached counter on the matching
//! join request.

use ordernet_crypto::ed25519::{Signature, SigningKey, VerifyingKey};
use ordernet_db::queries::{join_requests, vouches};
use ordernet_types::trust::{JoinRequest, JoinRequestStatus, Vouch};
use rusqlite::Connection;

use crate::Result;

/// Create, sign, and save a vouch, then refresh the vouchee's join-request
/// counter. Returns the vouch for transmission.
pub fn create_vouch(
    conn: &Connection,
    signer: &SigningKey,
    vouchee_pub: &[u8; 32],
    channel_id: &str,
    now: u64,
) -> Result<Vouch> {
    let mut vouch = Vouch {
        voucher_pub_key: signer.verifying_key().to_bytes(),
        vouchee_pub_key: *vouchee_pub,
        channel_id: channel_id.to_string(),
        timestamp: now,
        signature: [0u8; 64],
    };
    vouch.signature = signer.sign(&vouch.signable_bytes()?).to_bytes();

    save_vouch(conn, &vouch)?;
    Ok(vouch)
}

/// Verify a vouch signature against its canonical payload.
pub fn verify_vouch(vouch: &Vouch) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(&vouch.voucher_pub_key) else {
        return false;
    };
    let Ok(payload) = vouch.signable_bytes() else {
        return false;
    };
    key.verify(&payload, &Signature::from_bytes(&vouch.signature))
        .is_ok()
}

/// Persist a vouch idempotently and recompute the vouchee's counter.
/// Returns whether the vouch was new.
pub fn save_vouch(conn: &Connection, vouch: &Vouch) -> Result<bool> {
    let inserted = vouches::insert(
        conn,
        &vouches::VouchRow {
            voucher_pub_key: vouch.voucher_pub_key.to_vec(),
            vouchee_pub_key: vouch.vouchee_pub_key.to_vec(),
            channel_id: vouch.channel_id.clone(),
            timestamp: vouch.timestamp,
            signature: vouch.signature.to_vec(),
        },
    )?;

    let count = vouches::count_for(conn, &vouch.vouchee_pub_key, &vouch.channel_id)?;
    join_requests::set_vouches_received(conn, &vouch.vouchee_pub_key, &vouch.channel_id, count)?;

    Ok(inserted)
}

/// Record a pending join request; repeated requests are no-ops.
pub fn create_join_request(
    conn: &Connection,
    requester_pub: &[u8; 32],
    channel_id: &str,
    now: u64,
) -> Result<bool> {
    Ok(join_requests::insert(conn, requester_pub, channel_id, now)?)
}

/// Mark a join request approved, creating the row first if vouches arrived
/// before the request did.
pub fn approve_request(conn: &Connection, requester_pub: &[u8; 32], channel_id: &str) -> Result<()> {
    join_requests::insert(conn, requester_pub, channel_id, crate::now_ms())?;
    let count = vouches::count_for(conn, requester_pub, channel_id)?;
    join_requests::set_vouches_received(conn, requester_pub, channel_id, count)?;
    join_requests::set_status(
        conn,
        requester_pub,
        channel_id,
        JoinRequestStatus::Approved.as_str(),
    )?;
    Ok(())
}

/// Fetch a join request.
pub fn get_join_request(
    conn: &Connection,
    requester_pub: &[u8; 32],
    channel_id: &str,
) -> Result<Option<JoinRequest>> {
    let Some(row) = join_requests::get(conn, requester_pub, channel_id)? else {
        return Ok(None);
    };
    let requester_pub_key: [u8; 32] = row
        .requester_pub_key
        .as_slice()
        .try_into()
        .map_err(|_| crate::NodeError::Storage("corrupt requester key".into()))?;
    Ok(Some(JoinRequest {
        requester_pub_key,
        channel_id: row.channel_id,
        timestamp: row.timestamp,
        vouches_received: row.vouches_received,
        status: JoinRequestStatus::parse(&row.status),
    }))
}

/// Number of vouches recorded for a vouchee on a channel.
pub fn vouch_count(conn: &Connection, vouchee_pub: &[u8; 32], channel_id: &str) -> Result<u32> {
    Ok(vouches::count_for(conn, vouchee_pub, channel_id)?)
}

/// All (voucher, vouchee) edges of a channel as lowercase hex pairs.
/// Edges are directional, voucher to vouchee.
pub fn trust_graph(conn: &Connection, channel_id: &str) -> Result<Vec<(String, String)>> {
    let edges = vouches::edges(conn, channel_id)?;
    Ok(edges
        .into_iter()
        .map(|(voucher, vouchee)| (hex::encode(voucher), hex::encode(vouchee)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordernet_crypto::ed25519::KeyPair;

    #[test]
    fn test_create_vouch_signs_and_saves() {
        let conn = ordernet_db::open_memory().expect("open");
        let voucher = KeyPair::generate();
        let vouchee = [7u8; 32];

        let vouch =
            create_vouch(&conn, &voucher.signing_key, &vouchee, "general", 1000).expect("vouch");
        assert!(verify_vouch(&vouch));
        assert_eq!(vouch_count(&conn, &vouchee, "general").expect("count"), 1);
    }

    #[test]
    fn test_double_vouch_counts_once() {
        let conn = ordernet_db::open_memory().expect("open");
        let voucher = KeyPair::generate();
        let vouchee = [7u8; 32];

        create_vouch(&conn, &voucher.signing_key, &vouchee, "general", 1000).expect("vouch");
        create_vouch(&conn, &voucher.signing_key, &vouchee, "general", 2000).expect("again");
        assert_eq!(vouch_count(&conn, &vouchee, "general").expect("count"), 1);
    }

    #[test]
    fn test_tampered_vouch_fails_verification() {
        let conn = ordernet_db::open_memory().expect("open");
        let voucher = KeyPair::generate();
        let mut vouch =
            create_vouch(&conn, &voucher.signing_key, &[7u8; 32], "general", 1000).expect("vouch");

        vouch.channel_id = "other".into();
        assert!(!verify_vouch(&vouch));

        vouch.channel_id = "general".into();
        assert!(verify_vouch(&vouch));
        vouch.signature[0] ^= 1;
        assert!(!verify_vouch(&vouch));
    }

    #[test]
    fn test_saving_vouch_updates_join_request_counter() {
        let conn = ordernet_db::open_memory().expect("open");
        let vouchee = [7u8; 32];
        create_join_request(&conn, &vouchee, "general", 500).expect("request");

        let v1 = KeyPair::generate();
        let v2 = KeyPair::generate();
        create_vouch(&conn, &v1.signing_key, &vouchee, "general", 1000).expect("vouch");
        create_vouch(&conn, &v2.signing_key, &vouchee, "general", 1001).expect("vouch");

        let request = get_join_request(&conn, &vouchee, "general")
            .expect("get")
            .expect("row");
        assert_eq!(request.vouches_received, 2);
        assert_eq!(request.status, JoinRequestStatus::Pending);
    }

    #[test]
    fn test_approve_without_prior_request_creates_row() {
        let conn = ordernet_db::open_memory().expect("open");
        let vouchee = [7u8; 32];
        let voucher = KeyPair::generate();
        create_vouch(&conn, &voucher.signing_key, &vouchee, "general", 1000).expect("vouch");

        approve_request(&conn, &vouchee, "general").expect("approve");
        let request = get_join_request(&conn, &vouchee, "general")
            .expect("get")
            .expect("row");
        assert_eq!(request.status, JoinRequestStatus::Approved);
        assert_eq!(request.vouches_received, 1);
    }

    #[test]
    fn test_trust_graph_edges() {
        let conn = ordernet_db::open_memory().expect("open");
        let v1 = KeyPair::generate();
        let v2 = KeyPair::generate();
        let vouchee = [7u8; 32];

        create_vouch(&conn, &v1.signing_key, &vouchee, "general", 1000).expect("vouch");
        create_vouch(&conn, &v2.signing_key, &vouchee, "general", 1001).expect("vouch");
        create_vouch(&conn, &v1.signing_key, &vouchee, "other", 1002).expect("other channel");

        let graph = trust_graph(&conn, "general").expect("graph");
        assert_eq!(graph.len(), 2);
        assert_eq!(graph[0].0, hex::encode(v1.verifying_key.to_bytes()));
        assert!(graph.iter().all(|(_, vouchee_hex)| *vouchee_hex == hex::encode([7u8; 32])));
    }
}
