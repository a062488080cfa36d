
use super::*;
use fixture::{caches, layers, run, session, Call, Fixture, LAYERS};

const WORDS: [&str; 4] = ["Warsaw", " is", " in", " Poland."];

#[test]
fn test_reduced_session_keeps_layers_of_the_batch() {
    let mut full = session(4);
    full.k_v_caches = caches(0..LAYERS, 1.0);

    let reduced = reduced_session(&full, &run(ModelRunState::Steps(5)), 5);
    assert_eq!(layers(&reduced), vec![5, 6, 7, 8, 9]);
    assert_eq!(reduced.tos, full.tos, "stream is kept");

    let reduced = reduced_session(&full, &run(ModelRunState::Steps(10)), 5);
    assert_eq!(layers(&reduced), vec![10, 11], "batch past the last layer");
}

#[test]
fn test_reduced_session_without_steps_has_no_caches() {
    let mut full = session(4);
    full.k_v_caches = caches(0..LAYERS, 1.0);

    for state in [ModelRunState::Finish, ModelRunState::Finished] {
        let reduced = reduced_session(&full, &run(state.clone()), 5);
        assert!(reduced.k_v_caches.is_empty(), "{:?}", state);
    }
}

#[test]
fn test_simple_session_drops_caches_only() {
    let mut full = session(4);
    full.k_v_caches = caches(0..3, 1.0);

    let simple = simple_session(&full);
    assert!(simple.k_v_caches.is_empty());
    assert_eq!(simple.tos, full.tos);
    assert_eq!(
        simple.serialized_logit_processor,
        full.serialized_logit_processor
    );
}

#[test]
fn test_update_session_prefers_update() {
    let mut base = session(4);
    base.k_v_caches = caches(0..4, 1.0);
    base.tos.prompt_index = 3;

    let mut update = session(4);
    update.k_v_caches = caches(2..6, 2.0);
    update.tos.prompt_index = 1;

    let merged = update_session(base, update);
    assert_eq!(layers(&merged), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(merged.k_v_caches[&1], caches([1], 1.0)[&1], "kept from base");
    assert_eq!(merged.k_v_caches[&2], caches([2], 2.0)[&2], "replaced by update");
    assert_eq!(merged.tos.prompt_index, 3, "other fields come from base");
}

#[tokio::test]
async fn test_forward_rejects_zero_batch() {
    let backend = Fixture::new(4, 4, WORDS.to_vec());

    let result = forward(&backend, session(4), run(ModelRunState::Steps(0)), 0).await;

    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert!(backend.calls().is_empty(), "no call reaches the canister");
}

#[tokio::test]
async fn test_forward_runs_batches_until_finished() {
    let backend = Fixture::new(4, 4, WORDS.to_vec());
    let mut full = session(4);
    full.k_v_caches = caches(0..LAYERS, 1.0);

    let (forwarded, last) = forward(&backend, full, run(ModelRunState::Steps(0)), 5)
        .await
        .unwrap();

    assert_eq!(last.state, ModelRunState::Finished);
    assert_eq!(layers(&forwarded), (0..LAYERS).collect::<Vec<_>>());
    assert_eq!(
        backend.calls(),
        vec![
            Call::Forward {
                steps: 5,
                state: ModelRunState::Steps(0),
                caches: vec![0, 1, 2, 3, 4],
            },
            Call::Forward {
                steps: 5,
                state: ModelRunState::Steps(5),
                caches: vec![5, 6, 7, 8, 9],
            },
            Call::Forward {
                steps: 5,
                state: ModelRunState::Steps(10),
                caches: vec![10, 11],
            },
        ]
    );
}

#[tokio::test]
async fn test_start_iterative_consumes_prompt_in_chunks() {
    let backend = Fixture::new(5, 2, WORDS.to_vec());

    let (text, started) = start_iterative(&backend, session(5), 10).await.unwrap();

    assert_eq!(text, "Warsaw");
    assert_eq!(started.tos.prompt_index, 5);
    assert_eq!(layers(&started), (0..LAYERS).collect::<Vec<_>>());

    let begin_starts = backend
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::BeginStart { .. }))
        .collect::<Vec<_>>();
    assert_eq!(begin_starts.len(), 3, "2 + 2 + 1 prompt tokens");
    assert_eq!(
        begin_starts[0],
        Call::BeginStart {
            iterative: true,
            caches: vec![]
        }
    );
}

#[tokio::test]
async fn test_start_iterative_with_exhausted_prompt() {
    let backend = Fixture::new(0, 2, WORDS.to_vec());

    let (text, _) = start_iterative(&backend, session(0), 10).await.unwrap();

    assert_eq!(text, "");
    assert_eq!(
        backend.calls(),
        vec![Call::BeginStart {
            iterative: true,
            caches: vec![]
        }]
    );
}

#[tokio::test]
async fn test_step_sends_simple_sessions_and_keeps_caches() {
    let backend = Fixture::new(4, 4, WORDS.to_vec());
    let mut started = session(4);
    started.k_v_caches = caches(0..LAYERS, 1.0);

    let (text, eos, stepped) = step(&backend, started, 5).await.unwrap();

    assert_eq!(text.as_deref(), Some(" is"));
    assert!(!eos);
    assert_eq!(stepped.tos.tokens, vec![1], "stream comes from the canister");
    assert_eq!(layers(&stepped), (0..LAYERS).collect::<Vec<_>>());

    let calls = backend.calls();
    assert_eq!(calls.first(), Some(&Call::BeginStep { caches: vec![] }));
    assert_eq!(calls.last(), Some(&Call::EndStep { caches: vec![] }));
}

#[tokio::test]
async fn test_generate_stops_at_end_of_sequence() {
    let backend = Fixture::new(3, 2, WORDS.to_vec());
    let mut fragments = Vec::new();

    let text = generate(&backend, "Where is Warsaw?", Options::default(), |fragment| {
        fragments.push(fragment.to_string())
    })
    .await
    .unwrap();

    assert_eq!(text, "Warsaw is in Poland.");
    assert_eq!(fragments, WORDS.to_vec());

    let calls = backend.calls();
    assert_eq!(calls[0], Call::StartPrompt("Where is Warsaw?".to_string()));
    assert_eq!(
        calls
            .iter()
            .filter(|call| matches!(call, Call::EndStep { .. }))
            .count(),
        3
    );
}

#[tokio::test]
async fn test_generate_respects_max_steps() {
    let backend = Fixture::new(3, 3, WORDS.to_vec());
    let options = Options {
        max_steps: 2,
        ..Options::default()
    };

    let text = generate(&backend, "Where is Warsaw?", options, |_| {})
        .await
        .unwrap();

    assert_eq!(text, "Warsaw is in");
}
