use psi_core::{
    CommutativeBlinder, DataStructure, PrivateKey, PsiClient, PsiError, PsiServer, RistrettoParallel,
    RistrettoSequential,
};

const CLIENT_KEY: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26,
    27, 28, 29, 30, 31,
];
const SERVER_KEY: [u8; 32] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27,
    28, 29, 30, 31, 32,
];
const TRIALS: usize = 20;

fn client_inputs() -> Vec<String> {
    (0..10).map(|i| i.to_string()).collect()
}

fn server_inputs() -> Vec<String> {
    (0..100).map(|i| (i * 2).to_string()).collect()
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_create_from_static_key() {
    let server = PsiServer::create_from_key(&SERVER_KEY, false).unwrap();
    assert_eq!(server.private_key_bytes(), SERVER_KEY);
    let client = PsiClient::create_from_key(&CLIENT_KEY, false).unwrap();
    assert_eq!(client.private_key_bytes(), CLIENT_KEY);
}

#[test]
fn test_static_keys_are_deterministic() {
    let a = PsiServer::create_from_key(&SERVER_KEY, true).unwrap();
    let b = PsiServer::create_from_key(&SERVER_KEY, true).unwrap();
    let inputs = server_inputs();
    for kind in [DataStructure::Raw, DataStructure::Gcs, DataStructure::BloomFilter] {
        assert_eq!(
            a.create_setup_message(0.01, Some(10), &inputs, kind).unwrap(),
            b.create_setup_message(0.01, Some(10), &inputs, kind).unwrap()
        );
    }
}

#[test]
fn test_blinding_commutes() {
    let a = PrivateKey::generate();
    let b = PrivateKey::generate();
    let inputs = server_inputs();
    let blinder = RistrettoSequential;

    let ab = blinder.reblind(&blinder.hash_blind(&inputs, &a), &b).unwrap();
    let ba = blinder.reblind(&blinder.hash_blind(&inputs, &b), &a).unwrap();
    assert_eq!(ab, ba);
    assert_eq!(ab, RistrettoParallel.reblind(&RistrettoParallel.hash_blind(&inputs, &b), &a).unwrap());
}

#[test]
fn test_response_is_index_aligned() {
    let client = PsiClient::create_from_key(&CLIENT_KEY, true).unwrap();
    let server = PsiServer::create_from_key(&SERVER_KEY, true).unwrap();
    let inputs = client_inputs();

    let full = server.process_request(&client.create_request(&inputs)).unwrap();
    assert_eq!(full.len(), inputs.len());

    // Each position is unaffected by which other positions are present.
    for i in 0..inputs.len() {
        let single = server
            .process_request(&client.create_request(&inputs[i..=i]))
            .unwrap();
        assert_eq!(single.encrypted_elements[0], full.encrypted_elements[i]);
    }
}

#[test]
fn test_raw_intersection_is_exact() {
    init_logger();
    for reveal in [true, false] {
        let client = PsiClient::create_with_new_key(reveal);
        let server = PsiServer::create_with_new_key(reveal);
        let setup = server
            .create_setup_message(0.01, Some(10), &server_inputs(), DataStructure::Raw)
            .unwrap();
        let response = server
            .process_request(&client.create_request(&client_inputs()))
            .unwrap();

        assert_eq!(client.get_intersection_size(&setup, &response).unwrap(), 5);
        if reveal {
            assert_eq!(
                client.get_intersection(&setup, &response).unwrap(),
                vec![0, 2, 4, 6, 8]
            );
        } else {
            assert_eq!(
                client.get_intersection(&setup, &response),
                Err(PsiError::IntersectionNotRevealable)
            );
        }
    }
}

#[test]
fn test_compact_intersection_within_tolerance() {
    init_logger();
    let max_size = (5.0f64 * 1.1).ceil() as usize;
    for kind in [DataStructure::Gcs, DataStructure::BloomFilter] {
        let mut within = 0;
        for _ in 0..TRIALS {
            let client = PsiClient::create_with_new_key(true);
            let server = PsiServer::create_with_new_key(true);
            let setup = server
                .create_setup_message(0.01, Some(10), &server_inputs(), kind)
                .unwrap();
            let response = server
                .process_request(&client.create_request(&client_inputs()))
                .unwrap();

            let intersection = client.get_intersection(&setup, &response).unwrap();
            // No false negatives, ever.
            for i in [0, 2, 4, 6, 8] {
                assert!(intersection.contains(&i));
            }
            let size = client.get_intersection_size(&setup, &response).unwrap();
            assert_eq!(size, intersection.len());
            if size <= max_size {
                within += 1;
            }
        }
        assert!(within * 10 >= TRIALS * 9, "{}: {} of {} within", kind, within, TRIALS);
    }
}

#[test]
fn test_false_positive_rate_trends_to_target() {
    // A hint of one makes every client element face the full rate.
    let fpr = 0.05;
    let server_items: Vec<String> = (0..500).map(|i| format!("server-{}", i)).collect();
    let client_items: Vec<String> = (0..2000).map(|i| format!("client-{}", i)).collect();

    for kind in [DataStructure::Gcs, DataStructure::BloomFilter] {
        let client = PsiClient::create_with_new_key(false);
        let server = PsiServer::create_with_new_key(false);
        let setup = server
            .create_setup_message(fpr, Some(1), &server_items, kind)
            .unwrap();
        let response = server.process_request(&client.create_request(&client_items)).unwrap();
        let hits = client.get_intersection_size(&setup, &response).unwrap();
        let rate = hits as f64 / client_items.len() as f64;
        assert!(rate > fpr / 5.0 && rate < fpr * 2.0, "{}: observed rate {}", kind, rate);
    }
}

#[test]
fn test_gcs_setup_smaller_than_bloom_filter() {
    let server = PsiServer::create_with_new_key(false);
    let inputs: Vec<String> = (0..2000).map(|i| i.to_string()).collect();
    let gcs = server
        .create_setup_message(0.01, Some(100), &inputs, DataStructure::Gcs)
        .unwrap();
    let bloom = server
        .create_setup_message(0.01, Some(100), &inputs, DataStructure::BloomFilter)
        .unwrap();
    let raw = server
        .create_setup_message(0.01, Some(100), &inputs, DataStructure::Raw)
        .unwrap();
    assert!(gcs.encoded_set.len() < bloom.encoded_set.len());
    assert!(bloom.encoded_set.len() < raw.encoded_set.len());
}

#[test]
fn test_association_table_states() {
    let client = PsiClient::create_with_new_key(true);
    let server = PsiServer::create_with_new_key(true);

    let server_states = ["HI", "VT", "AZ", "SC", "HI", "AL", "MD", "MS", "AZ", "FL", "CT", "WA"];
    let client_states = ["OH", "NH", "AZ", "IL", "OK", "AZ", "VT"];

    let (setup, permutation) = server
        .create_setup_message_with_permutation(0.0, None, &server_states, DataStructure::Raw)
        .unwrap();
    let response = server
        .process_request(&client.create_request(&client_states))
        .unwrap();

    let table = client.get_association_table(&setup, &response).unwrap();
    assert_eq!(table.client_indices.len(), table.server_indices.len());
    let table = table.apply_permutation(&permutation).unwrap();
    assert_eq!(
        table.sorted_pairs(),
        vec![(2, 2), (2, 8), (5, 2), (5, 8), (6, 1)]
    );
}

#[test]
fn test_association_completeness() {
    let client = PsiClient::create_with_new_key(true);
    let server = PsiServer::create_with_new_key(true);
    let client_items = ["AZ", "AZ", "OK"];
    let server_items = ["AZ", "AZ", "HI"];

    for kind in [DataStructure::Raw, DataStructure::Gcs] {
        let (setup, permutation) = server
            .create_setup_message_with_permutation(1e-6, Some(3), &server_items, kind)
            .unwrap();
        let response = server
            .process_request(&client.create_request(&client_items))
            .unwrap();
        let table = client
            .get_association_table_with_permutation(&setup, &response, &permutation)
            .unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.sorted_pairs(), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }
}

#[test]
fn test_mode_mismatch_detected_by_server() {
    let client = PsiClient::create_with_new_key(false);
    let server = PsiServer::create_with_new_key(true);
    assert_eq!(
        server.process_request(&client.create_request(&["x"])),
        Err(PsiError::IntersectionModeMismatch {
            local: true,
            remote: false
        })
    );
}
