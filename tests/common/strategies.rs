use proptest::prelude::*;
use execution_tracker::state_machine::StepRecordState;

pub fn step_record_state_strategy() -> impl Strategy<Value = StepRecordState> {
    prop_oneof![
        Just(StepRecordState::Pending),
        Just(StepRecordState::InProgress),
        Just(StepRecordState::Completed),
        Just(StepRecordState::Skipped),
        Just(StepRecordState::Failed),
    ]
}

pub fn terminal_state_strategy() -> impl Strategy<Value = StepRecordState> {
    prop_oneof![
        Just(StepRecordState::Completed),
        Just(StepRecordState::Skipped),
        Just(StepRecordState::Failed),
    ]
}

/// Skip or failure reasons, including empty and whitespace-only ones
pub fn reason_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[ \t\n]{1,5}",
        "[a-zA-Z][a-zA-Z0-9 .,]{0,40}",
    ]
}
