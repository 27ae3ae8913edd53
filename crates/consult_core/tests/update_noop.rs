use consult_core::{update, CollectorConfig, CollectorState, Msg};

#[test]
fn update_is_noop() {
    let state = CollectorState::new(CollectorConfig::default()).unwrap();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
