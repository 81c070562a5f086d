mod common;

mod breakpoints;

use crate::common::{frame, start_session, Event, TestHooks, PROGRAM_END};
use emudbg::debugger::{
    BreakpointRegistry, Error, ResumeReason, RunState, SuspendReason,
};
use serial_test::serial;
use std::sync::Arc;

#[test]
#[serial]
fn test_session_start() {
    let hooks = TestHooks::default();
    let session = start_session(&hooks, Arc::new(BreakpointRegistry::new()));

    assert!(session.is_started());
    assert_eq!(session.state(), RunState::Suspended);
    assert_eq!(session.top_frame(), Some(frame(1)));
    assert_eq!(session.registers().scalar(0), Some(1));
    assert!(session.can_resume());
    assert!(session.can_step_into());
    assert!(!session.can_suspend());
}

#[test]
#[serial]
fn test_step_into() {
    let hooks = TestHooks::default();
    let session = start_session(&hooks, Arc::new(BreakpointRegistry::new()));

    session.step_into().unwrap();
    assert_eq!(hooks.wait_suspend(1), (SuspendReason::StepEnd, frame(2)));
    session.step_into().unwrap();
    assert_eq!(hooks.wait_suspend(2), (SuspendReason::StepEnd, frame(3)));

    assert_eq!(session.line(), 3);
    let v1 = session.registers().vector(1).unwrap();
    assert_eq!(v1[0], 3);
    assert_eq!(v1[15], 18);

    let events = hooks.events();
    let resumes = events
        .iter()
        .filter(|e| **e == Event::Resume(ResumeReason::StepInto))
        .count();
    assert_eq!(resumes, 2);
}

#[test]
#[serial]
fn test_suspend_running_program() {
    let hooks = TestHooks::default();
    let session = start_session(&hooks, Arc::new(BreakpointRegistry::new()));

    session.resume().unwrap();
    assert!(session.can_suspend());
    assert_eq!(session.top_frame(), None);

    session.suspend().unwrap();
    assert_eq!(
        hooks.wait_suspend(1),
        (SuspendReason::ClientRequest, frame(PROGRAM_END))
    );
    assert_eq!(session.state(), RunState::Suspended);
    assert_eq!(session.registers().scalar(0), Some(PROGRAM_END));
}

#[test]
#[serial]
fn test_read_memory() {
    let hooks = TestHooks::default();
    let session = start_session(&hooks, Arc::new(BreakpointRegistry::new()));

    let block = session.memory_block(0x1fe, 4).unwrap();
    assert_eq!(block.length(), 4);
    hooks.wait_for(|e| matches!(e, Event::Memory(0x1fe, _)));
    assert_eq!(block.bytes(), vec![0xfe, 0xff, 0x00, 0x01]);
}

#[test]
#[serial]
fn test_terminate() {
    let hooks = TestHooks::default();
    let session = start_session(&hooks, Arc::new(BreakpointRegistry::new()));

    session.resume().unwrap();
    session.terminate().unwrap();
    assert!(session.is_terminated());
    assert!(!session.can_terminate());
    assert!(matches!(
        session.resume(),
        Err(Error::InvalidState {
            state: RunState::Terminated,
            ..
        })
    ));
    assert!(session.terminate().is_err());

    let terminations = hooks
        .events()
        .into_iter()
        .filter(|e| *e == Event::Terminate)
        .count();
    assert_eq!(terminations, 1);
}

#[test]
#[serial]
fn test_emulator_exit_terminates_session() {
    let hooks = TestHooks::default();
    let session = start_session(&hooks, Arc::new(BreakpointRegistry::new()));

    session.resume().unwrap();
    session.suspend().unwrap();
    hooks.wait_suspend(1);

    // step past the last line finishes the program
    session.step_into().unwrap();
    hooks.wait_for(|e| *e == Event::Terminate);
    assert!(session.is_terminated());
    assert!(session.step_into().is_err());
}
