use crate::common::{frame, start_session, Event, TestHooks, SOURCE};
use emudbg::debugger::{
    toggle_line_breakpoint, BreakpointEvent, BreakpointRegistry, BreakpointStore,
    LogicalBreakpoint, SuspendReason, Toggle,
};
use serial_test::serial;
use std::sync::Arc;

fn store_with(lines: &[u32]) -> Arc<BreakpointRegistry> {
    let store = BreakpointRegistry::new();
    for &line in lines {
        store.add(LogicalBreakpoint::new(SOURCE, line));
    }
    Arc::new(store)
}

#[test]
#[serial]
fn test_installed_breakpoint_hit() {
    let hooks = TestHooks::default();
    let store = store_with(&[5, 9]);
    let session = start_session(&hooks, store.clone());

    hooks.wait_for(|e| matches!(e, Event::Breakpoint(BreakpointEvent::Placed(b)) if b.line == 9));

    session.resume().unwrap();
    assert_eq!(hooks.wait_suspend(1), (SuspendReason::Breakpoint, frame(5)));
    assert_eq!(session.registers().scalar(0), Some(5));

    session.resume().unwrap();
    assert_eq!(hooks.wait_suspend(2), (SuspendReason::Breakpoint, frame(9)));
}

#[test]
#[serial]
fn test_installed_breakpoint_relocated_and_disabled() {
    let hooks = TestHooks::default();
    let store = store_with(&[4, 30]);
    let session = start_session(&hooks, store.clone());

    let relocated = hooks.wait_for(|e| {
        matches!(
            e,
            Event::Breakpoint(BreakpointEvent::Relocated { from: 4, .. })
        )
    });
    let Event::Breakpoint(BreakpointEvent::Relocated { brkpt, .. }) = relocated else {
        unreachable!()
    };
    assert_eq!(brkpt.line, 5);
    hooks.wait_for(|e| matches!(e, Event::Breakpoint(BreakpointEvent::Disabled(_))));

    let all = store.all();
    assert_eq!(all.len(), 2);
    assert_eq!((all[0].line, all[0].enabled), (5, true));
    assert_eq!((all[1].line, all[1].enabled), (30, false));

    session.resume().unwrap();
    assert_eq!(hooks.wait_suspend(1), (SuspendReason::Breakpoint, frame(5)));
}

#[test]
#[serial]
fn test_toggle_breakpoint_in_session() {
    let hooks = TestHooks::default();
    let store = store_with(&[]);
    let session = start_session(&hooks, store.clone());

    let toggle = toggle_line_breakpoint(store.as_ref(), Some(&*session), SOURCE, 8).unwrap();
    assert_eq!(toggle, Toggle::Requested);
    hooks.wait_for(|e| {
        matches!(
            e,
            Event::Breakpoint(BreakpointEvent::Relocated { from: 8, .. })
        )
    });
    assert!(store.find(SOURCE, 9).is_some());
    assert!(store.find(SOURCE, 8).is_none());

    // rejected breakpoint leaves no trace
    toggle_line_breakpoint(store.as_ref(), Some(&*session), SOURCE, 99).unwrap();
    hooks.wait_for(|e| {
        matches!(
            e,
            Event::Breakpoint(BreakpointEvent::Rejected { line: 99, .. })
        )
    });
    assert_eq!(store.all().len(), 1);

    session.resume().unwrap();
    assert_eq!(hooks.wait_suspend(1), (SuspendReason::Breakpoint, frame(9)));

    let toggle = toggle_line_breakpoint(store.as_ref(), Some(&*session), SOURCE, 9).unwrap();
    assert!(matches!(toggle, Toggle::Removed(b) if b.line == 9));
    assert!(store.all().is_empty());
}

#[test]
#[serial]
fn test_breakpoints_survive_session() {
    let path = std::env::temp_dir().join(format!("emudbg-brkpts-{}.toml", uuid::Uuid::new_v4()));
    let store = Arc::new(BreakpointRegistry::with_file(&path).unwrap());
    toggle_line_breakpoint(store.as_ref(), None, SOURCE, 6).unwrap();

    {
        let hooks = TestHooks::default();
        let session = start_session(&hooks, store.clone());
        hooks.wait_for(|e| matches!(e, Event::Breakpoint(BreakpointEvent::Relocated { .. })));
        session.terminate().unwrap();
        // terminated session is treated as no session
        let toggle = toggle_line_breakpoint(store.as_ref(), Some(&*session), SOURCE, 11).unwrap();
        assert!(matches!(toggle, Toggle::Added(_)));
    }

    let reloaded = BreakpointRegistry::with_file(&path).unwrap();
    let lines: Vec<u32> = reloaded.all().iter().map(|b| b.line).collect();
    assert_eq!(lines, vec![7, 11]);

    std::fs::remove_file(path).unwrap();
}
