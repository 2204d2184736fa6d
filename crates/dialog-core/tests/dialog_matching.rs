//! Dialog creation, in-order matching and CSeq mismatch recovery

mod common;

use std::sync::Arc;

use futures::future::join_all;
use proptest::prelude::*;

use common::{incoming, request, user_agent};
use sipua_dialog_core::prelude::*;

async fn established(ua: &UserAgent, call_id: &str, cseq: u32) -> Dialog {
    let invite = incoming(request("INVITE", call_id, None, cseq));
    ua.create_dialog(&invite).await.unwrap()
}

#[tokio::test]
async fn test_dialog_created_from_invite() {
    let (ua, _) = user_agent(UaConfig::default());
    let invite = incoming(request("INVITE", "call-1@atlanta.com", None, 314159));
    let dialog = ua.create_dialog(&invite).await.unwrap();

    assert_eq!(dialog.id, DialogId::new("call-1@atlanta.com", invite.to_tag.clone(), "1928301774"));
    assert_eq!(dialog.remote_cseq, 314159);
    assert_eq!(dialog.local_cseq, 0);
    assert_eq!(dialog.remote_target.to_string(), "sip:alice@192.0.2.1:5061");
    assert_eq!(dialog.local_target.to_string(), "sip:192.0.2.4:5060;transport=UDP");
    assert_eq!(ua.get_dialog(&dialog.id).await.unwrap(), Some(dialog));
}

#[tokio::test]
async fn test_initial_request_is_not_matched() {
    let (ua, _) = user_agent(UaConfig::default());
    let invite = incoming(request("INVITE", "call-1", None, 1));
    assert_eq!(ua.match_dialog(&invite).await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_dialog_is_not_matched() {
    let (ua, _) = user_agent(UaConfig::default());
    let bye = incoming(request("BYE", "call-1", Some("nosuchtag"), 2));
    assert_eq!(ua.match_dialog(&bye).await.unwrap(), None);
    assert_eq!(ua.recovered_dialogs(), 0);
}

#[tokio::test]
async fn test_unmatched_requests_leave_no_locks() {
    let (ua, _) = user_agent(UaConfig::default());
    let dialog = established(&ua, "call-1", 1).await;

    for (n, cseq) in (2..50).enumerate() {
        let bogus = incoming(request("BYE", &format!("call-{}", n), Some(&format!("tag-{}", n)), cseq));
        assert_eq!(ua.match_dialog(&bogus).await.unwrap(), None);
    }
    assert_eq!(ua.dialogs().lock_count(), 0);

    let info = incoming(request("INFO", "call-1", Some(&dialog.id.local_tag), 2));
    assert!(ua.match_dialog(&info).await.unwrap().is_some());
    assert_eq!(ua.dialogs().lock_count(), 0);
}

#[tokio::test]
async fn test_in_order_requests_advance_remote_cseq() {
    let (ua, _) = user_agent(UaConfig::default());
    let dialog = established(&ua, "call-1", 10).await;

    for cseq in 11..=13 {
        let info = incoming(request("INFO", "call-1", Some(&dialog.id.local_tag), cseq));
        let matched = ua.match_dialog(&info).await.unwrap().expect("dialog should match");
        assert_eq!(matched.id, dialog.id);
        assert_eq!(matched.remote_cseq, cseq);
    }

    let stored = ua.get_dialog(&dialog.id).await.unwrap().unwrap();
    assert_eq!(stored.remote_cseq, 13);
    assert_eq!(ua.recovered_dialogs(), 0);
}

#[tokio::test]
async fn test_cseq_gap_recreates_dialog() {
    let (ua, _) = user_agent(UaConfig::default());
    let dialog = established(&ua, "call-1", 10).await;

    let late = incoming(request("INFO", "call-1", Some(&dialog.id.local_tag), 15));
    let recovered = ua.match_dialog(&late).await.unwrap().expect("dialog should be recreated");

    assert_eq!(recovered.id, dialog.id);
    assert_eq!(recovered.remote_cseq, 15);
    assert_eq!(ua.recovered_dialogs(), 1);
    assert_eq!(ua.get_dialog(&dialog.id).await.unwrap(), Some(recovered));
}

#[tokio::test]
async fn test_replayed_cseq_recreates_dialog() {
    let (ua, _) = user_agent(UaConfig::default());
    let dialog = established(&ua, "call-1", 10).await;

    let replay = incoming(request("INFO", "call-1", Some(&dialog.id.local_tag), 10));
    let recovered = ua.match_dialog(&replay).await.unwrap().unwrap();
    assert_eq!(recovered.remote_cseq, 10);
    assert_eq!(ua.recovered_dialogs(), 1);
}

#[tokio::test]
async fn test_recovery_keeps_local_cseq_reset() {
    let (ua, _) = user_agent(UaConfig::default());
    let dialog = established(&ua, "call-1", 1).await;
    ua.dialogs().incr_local_cseq(&dialog.id).await.unwrap();

    let late = incoming(request("INFO", "call-1", Some(&dialog.id.local_tag), 7));
    let recovered = ua.match_dialog(&late).await.unwrap().unwrap();
    assert_eq!(recovered.local_cseq, 0);
}

#[tokio::test]
async fn test_remove_dialog() {
    let (ua, _) = user_agent(UaConfig::default());
    let dialog = established(&ua, "call-1", 1).await;

    ua.remove_dialog(&dialog.id).await.unwrap();
    assert_eq!(ua.get_dialog(&dialog.id).await.unwrap(), None);
    assert!(matches!(
        ua.remove_dialog(&dialog.id).await,
        Err(DialogError::Storage(StorageError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_concurrent_requests_on_one_dialog_are_serialized() {
    let (ua, _) = user_agent(UaConfig::default());
    let dialog = established(&ua, "call-1", 100).await;
    let ua = Arc::new(ua);

    // all claim the next CSeq; exactly one can be in order
    let requests: Vec<_> = (0..8)
        .map(|_| incoming(request("INFO", "call-1", Some(&dialog.id.local_tag), 101)))
        .collect();
    let results = join_all(requests.iter().map(|request| ua.match_dialog(request))).await;

    for result in results {
        assert_eq!(result.unwrap().unwrap().remote_cseq, 101);
    }
    assert_eq!(ua.recovered_dialogs(), 7);
    assert_eq!(ua.get_dialog(&dialog.id).await.unwrap().unwrap().remote_cseq, 101);
}

#[tokio::test]
async fn test_distinct_dialogs_do_not_interfere() {
    let (ua, _) = user_agent(UaConfig::default());
    let a = established(&ua, "call-a", 1).await;
    let b = established(&ua, "call-b", 50).await;

    let requests = vec![
        incoming(request("INFO", "call-a", Some(&a.id.local_tag), 2)),
        incoming(request("INFO", "call-b", Some(&b.id.local_tag), 51)),
    ];
    let results = join_all(requests.iter().map(|request| ua.match_dialog(request))).await;

    let cseqs: Vec<u32> = results.into_iter().map(|r| r.unwrap().unwrap().remote_cseq).collect();
    assert_eq!(cseqs, vec![2, 51]);
    assert_eq!(ua.recovered_dialogs(), 0);
}

proptest! {
    #[test]
    fn prop_storage_key_is_injective(
        a in ("[a-z;,\"\\[\\]]{0,6}", "[a-z;,\"]{0,6}", "[a-z;,\"]{0,6}"),
        b in ("[a-z;,\"\\[\\]]{0,6}", "[a-z;,\"]{0,6}", "[a-z;,\"]{0,6}"),
    ) {
        let id_a = DialogId::new(a.0, a.1, a.2);
        let id_b = DialogId::new(b.0, b.1, b.2);
        prop_assert_eq!(id_a == id_b, id_a.storage_key() == id_b.storage_key());
    }
}
