mod common;

use common::*;
use keelson::event::{HostEvent, PointerConstraintEvent, PointerEvent};
use keelson::input::Capability;
use keelson::pointer_constraints::ConstraintLifetime;
use keelson::utils::{Rectangle, RegionAttributes};
use keelson::{ClientId, Display, ErrorCode, SeatId, SurfaceId};

struct Fixture {
    display: Display,
    seat: SeatId,
    client: ClientId,
    surface: SurfaceId,
}

fn fixture() -> Fixture {
    let mut display = Display::new();
    let seat = display.create_seat_with_capabilities("seat0", Capability::POINTER);
    let client = display.create_client();
    let surface = display.create_surface(client);
    Fixture {
        display,
        seat,
        client,
        surface,
    }
}

fn region(x: i32, y: i32, w: i32, h: i32) -> RegionAttributes {
    let mut region = RegionAttributes::default();
    region.add(Rectangle::from_loc_and_size((x, y), (w, h)));
    region
}

#[test]
fn confinement_clamps_motion_to_the_region() {
    let mut f = fixture();
    let d = &mut f.display;

    d.confine_pointer(f.surface, f.seat, Some(region(0, 0, 100, 100)), ConstraintLifetime::Persistent)
        .unwrap();

    d.notify_pointer_enter(f.seat, f.surface, (0.0, 0.0).into(), (50.0, 50.0).into());
    let events = d.take_events(f.client);
    assert!(constraint_events(&events)
        .iter()
        .any(|e| matches!(e, PointerConstraintEvent::Confined)));

    // motion inside the region flows
    d.notify_pointer_motion(f.seat, 1, (80.0, 80.0).into());
    // motion outside is swallowed and the pointer stays put
    d.notify_pointer_motion(f.seat, 2, (150.0, 80.0).into());

    let events = d.take_events(f.client);
    let motions: Vec<_> = pointer_events(&events)
        .into_iter()
        .filter(|e| matches!(e, PointerEvent::Motion { .. }))
        .collect();
    assert_eq!(motions.len(), 1);
    assert_eq!(d.pointer_position(f.seat), Some((80.0, 80.0).into()));
}

#[test]
fn confinement_respects_the_input_region() {
    let mut f = fixture();
    let d = &mut f.display;

    d.surface_set_input_region(f.surface, Some(region(0, 0, 60, 60)));
    d.surface_commit(f.surface);
    d.confine_pointer(f.surface, f.seat, Some(region(0, 0, 100, 100)), ConstraintLifetime::Persistent)
        .unwrap();
    d.notify_pointer_enter(f.seat, f.surface, (0.0, 0.0).into(), (10.0, 10.0).into());
    d.take_events(f.client);

    // inside the constraint region but outside the input region
    d.notify_pointer_motion(f.seat, 1, (80.0, 10.0).into());
    let events = d.take_events(f.client);
    assert!(pointer_events(&events).is_empty());
    assert_eq!(d.pointer_position(f.seat), Some((10.0, 10.0).into()));
}

#[test]
fn locks_suppress_motion_entirely() {
    let mut f = fixture();
    let d = &mut f.display;

    d.lock_pointer(f.surface, f.seat, None, ConstraintLifetime::Persistent)
        .unwrap();
    d.notify_pointer_enter(f.seat, f.surface, (0.0, 0.0).into(), (30.0, 30.0).into());
    let events = d.take_events(f.client);
    assert!(constraint_events(&events)
        .iter()
        .any(|e| matches!(e, PointerConstraintEvent::Locked)));

    d.notify_pointer_motion(f.seat, 1, (90.0, 90.0).into());
    let events = d.take_events(f.client);
    assert!(pointer_events(&events).is_empty());
    assert_eq!(d.pointer_position(f.seat), Some((30.0, 30.0).into()));
}

#[test]
fn cursor_position_hints_surface_on_commit() {
    let mut f = fixture();
    let d = &mut f.display;

    d.lock_pointer(f.surface, f.seat, None, ConstraintLifetime::Persistent)
        .unwrap();
    d.notify_pointer_enter(f.seat, f.surface, (0.0, 0.0).into(), (30.0, 30.0).into());

    d.locked_pointer_set_cursor_position_hint(f.surface, f.seat, (12.0, 13.0).into());
    // nothing happens before the commit
    assert!(d.take_host_events().is_empty());

    d.surface_commit(f.surface);
    assert_eq!(
        d.take_host_events(),
        vec![HostEvent::CursorPositionHint {
            surface: f.surface,
            seat: f.seat,
            position: (12.0, 13.0).into(),
        }]
    );
}

#[test]
fn oneshot_constraints_die_on_first_deactivation() {
    let mut f = fixture();
    let d = &mut f.display;

    d.confine_pointer(f.surface, f.seat, None, ConstraintLifetime::OneShot)
        .unwrap();
    d.notify_pointer_enter(f.seat, f.surface, (0.0, 0.0).into(), (10.0, 10.0).into());
    d.notify_pointer_leave(f.seat);

    let events = d.take_events(f.client);
    let constraint = constraint_events(&events);
    assert_eq!(
        constraint,
        vec![&PointerConstraintEvent::Confined, &PointerConstraintEvent::Unconfined]
    );

    // the object is gone; a new constraint may take its place
    assert!(d.with_pointer_constraint(f.surface, f.seat, |c| c.is_none()));
    d.confine_pointer(f.surface, f.seat, None, ConstraintLifetime::OneShot)
        .unwrap();
}

#[test]
fn persistent_constraints_reactivate_on_refocus() {
    let mut f = fixture();
    let d = &mut f.display;

    d.lock_pointer(f.surface, f.seat, None, ConstraintLifetime::Persistent)
        .unwrap();
    d.notify_pointer_enter(f.seat, f.surface, (0.0, 0.0).into(), (10.0, 10.0).into());
    d.notify_pointer_leave(f.seat);
    d.notify_pointer_enter(f.seat, f.surface, (0.0, 0.0).into(), (20.0, 20.0).into());

    let events = d.take_events(f.client);
    assert_eq!(
        constraint_events(&events),
        vec![
            &PointerConstraintEvent::Locked,
            &PointerConstraintEvent::Unlocked,
            &PointerConstraintEvent::Locked,
        ]
    );
    assert!(d.with_pointer_constraint(f.surface, f.seat, |c| c.is_some()));
}

#[test]
fn a_second_constraint_is_a_protocol_error() {
    let mut f = fixture();
    let d = &mut f.display;

    d.confine_pointer(f.surface, f.seat, None, ConstraintLifetime::Persistent)
        .unwrap();
    let err = d
        .lock_pointer(f.surface, f.seat, None, ConstraintLifetime::Persistent)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AlreadyConstrained);

    // another seat's pointer is a different pair
    let other_seat = d.create_seat_with_capabilities("seat1", Capability::POINTER);
    d.lock_pointer(f.surface, other_seat, None, ConstraintLifetime::Persistent)
        .unwrap();
}

#[test]
fn an_emptied_region_deactivates_the_constraint() {
    let mut f = fixture();
    let d = &mut f.display;

    d.confine_pointer(f.surface, f.seat, Some(region(0, 0, 50, 50)), ConstraintLifetime::Persistent)
        .unwrap();
    d.notify_pointer_enter(f.seat, f.surface, (0.0, 0.0).into(), (10.0, 10.0).into());
    d.take_events(f.client);

    d.pointer_constraint_set_region(f.surface, f.seat, Some(RegionAttributes::default()));
    d.surface_commit(f.surface);

    let events = d.take_events(f.client);
    assert!(constraint_events(&events)
        .iter()
        .any(|e| matches!(e, PointerConstraintEvent::Unconfined)));
}

#[test]
fn region_updates_are_double_buffered() {
    let mut f = fixture();
    let d = &mut f.display;

    d.confine_pointer(f.surface, f.seat, Some(region(0, 0, 100, 100)), ConstraintLifetime::Persistent)
        .unwrap();
    d.notify_pointer_enter(f.seat, f.surface, (0.0, 0.0).into(), (10.0, 10.0).into());
    d.take_events(f.client);

    // staged but not yet committed: the old region still applies
    d.pointer_constraint_set_region(f.surface, f.seat, Some(region(0, 0, 20, 20)));
    d.notify_pointer_motion(f.seat, 1, (80.0, 80.0).into());
    let events = d.take_events(f.client);
    assert_eq!(pointer_events(&events).len(), 1);

    d.surface_commit(f.surface);
    d.notify_pointer_motion(f.seat, 2, (90.0, 90.0).into());
    let events = d.take_events(f.client);
    assert!(pointer_events(&events).is_empty());
}

#[test]
fn destroying_the_constraint_is_silent() {
    let mut f = fixture();
    let d = &mut f.display;

    d.confine_pointer(f.surface, f.seat, None, ConstraintLifetime::Persistent)
        .unwrap();
    d.notify_pointer_enter(f.seat, f.surface, (0.0, 0.0).into(), (10.0, 10.0).into());
    d.take_events(f.client);

    d.destroy_pointer_constraint(f.surface, f.seat);
    assert!(d.with_pointer_constraint(f.surface, f.seat, |c| c.is_none()));

    // motion flows unconstrained again
    d.notify_pointer_motion(f.seat, 1, (500.0, 500.0).into());
    let events = d.take_events(f.client);
    assert_eq!(pointer_events(&events).len(), 1);
}
