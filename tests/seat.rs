mod common;

use common::*;
use keelson::client::ClientVersions;
use keelson::event::{ClientEvent, KeyboardEvent, PointerEvent, SeatEvent, TouchEvent};
use keelson::input::keyboard::KeyState;
use keelson::input::pointer::{Axis, AxisSource, ButtonState};
use keelson::input::Capability;
use keelson::Display;

const BTN_LEFT: u32 = 0x110;

#[test]
fn capabilities_follow_device_changes() {
    let mut display = Display::new();
    let client = display.create_client();
    let seat = display.create_seat("seat0");
    assert_eq!(display.seat_name(seat), Some("seat0"));

    display.seat_add_pointer(seat);
    display.seat_add_keyboard(seat);
    display.seat_remove_pointer(seat);

    let events = display.take_events(client);
    let caps: Vec<_> = seat_events(&events)
        .into_iter()
        .map(|e| match e {
            SeatEvent::Capabilities { capabilities } => *capabilities,
        })
        .collect();
    assert_eq!(
        caps,
        vec![
            Capability::POINTER,
            Capability::POINTER | Capability::KEYBOARD,
            Capability::KEYBOARD,
        ]
    );
    assert_eq!(display.seat_capabilities(seat), Capability::KEYBOARD);
}

#[test]
fn pointer_focus_cycle_delivers_in_order() {
    let mut display = Display::new();
    let client = display.create_client();
    let seat = display.create_seat_with_capabilities("seat0", Capability::POINTER);
    let surface = display.create_surface(client);

    display.notify_pointer_enter(seat, surface, (10.0, 10.0).into(), (15.0, 12.0).into());
    display.notify_pointer_motion(seat, 1, (20.0, 20.0).into());
    display.notify_pointer_button(seat, 2, BTN_LEFT, ButtonState::Pressed);
    display.notify_pointer_axis(seat, 3, Axis::VerticalScroll, 10.0, Some(1), AxisSource::Wheel);
    display.notify_pointer_frame(seat);
    display.notify_pointer_button(seat, 4, BTN_LEFT, ButtonState::Released);
    display.notify_pointer_leave(seat);

    let events = display.take_events(client);
    let pointer = pointer_events(&events);

    // enter (with its frame), then the motion/button/axis burst, then the
    // explicit frame, release, and the leave with its frame
    assert!(matches!(
        pointer[0],
        PointerEvent::Enter { surface: s, position, .. }
            if *s == surface && *position == (5.0, 2.0).into()
    ));
    assert!(matches!(pointer[1], PointerEvent::Frame));
    assert!(matches!(
        pointer[2],
        PointerEvent::Motion { time: 1, position } if *position == (10.0, 10.0).into()
    ));
    assert!(matches!(
        pointer[3],
        PointerEvent::Button {
            button: BTN_LEFT,
            state: ButtonState::Pressed,
            ..
        }
    ));
    assert!(matches!(
        pointer[4],
        PointerEvent::Axis {
            axis: Axis::VerticalScroll,
            ..
        }
    ));
    assert!(matches!(pointer[5], PointerEvent::Frame));
    assert!(matches!(
        pointer[6],
        PointerEvent::Button {
            state: ButtonState::Released,
            ..
        }
    ));
    assert!(matches!(pointer[7], PointerEvent::Leave { surface: s, .. } if *s == surface));
    assert!(matches!(pointer[8], PointerEvent::Frame));

    assert_eq!(display.seat_timestamp(seat), Some(4));
}

#[test]
fn pointer_serials_increase() {
    let mut display = Display::new();
    let client = display.create_client();
    let seat = display.create_seat_with_capabilities("seat0", Capability::POINTER);
    let a = display.create_surface(client);
    let b = display.create_surface(client);

    display.notify_pointer_enter(seat, a, (0.0, 0.0).into(), (1.0, 1.0).into());
    display.notify_pointer_enter(seat, b, (0.0, 0.0).into(), (1.0, 1.0).into());

    let events = display.take_events(client);
    let serials: Vec<_> = pointer_events(&events)
        .into_iter()
        .filter_map(|e| match e {
            PointerEvent::Enter { serial, .. } | PointerEvent::Leave { serial, .. } => Some(*serial),
            _ => None,
        })
        .collect();
    assert_eq!(serials.len(), 3); // enter a, leave a, enter b
    assert!(serials.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn frame_events_are_version_gated() {
    let mut display = Display::new();
    let client = display.create_client_with_versions(ClientVersions {
        wl_seat: 4,
        ..Default::default()
    });
    let seat = display.create_seat_with_capabilities("seat0", Capability::POINTER);
    let surface = display.create_surface(client);

    display.notify_pointer_enter(seat, surface, (0.0, 0.0).into(), (0.0, 0.0).into());
    display.notify_pointer_motion(seat, 1, (5.0, 5.0).into());
    display.notify_pointer_frame(seat);

    let events = display.take_events(client);
    assert!(pointer_events(&events)
        .into_iter()
        .all(|e| !matches!(e, PointerEvent::Frame)));
}

#[test]
fn events_to_destroyed_surfaces_are_dropped() {
    let mut display = Display::new();
    let client = display.create_client();
    let seat = display.create_seat_with_capabilities("seat0", Capability::POINTER);
    let surface = display.create_surface(client);

    display.notify_pointer_enter(seat, surface, (0.0, 0.0).into(), (0.0, 0.0).into());
    display.take_events(client);

    display.destroy_surface(surface);
    display.notify_pointer_motion(seat, 1, (5.0, 5.0).into());
    display.notify_pointer_button(seat, 2, BTN_LEFT, ButtonState::Pressed);

    let events = display.take_events(client);
    assert!(pointer_events(&events).is_empty());
    assert_eq!(display.pointer_focus(seat), None);
}

#[test]
fn keyboard_focus_sends_leave_then_enter_with_held_keys() {
    let mut display = Display::new();
    let client = display.create_client();
    let seat = display.create_seat_with_capabilities("seat0", Capability::KEYBOARD);
    let a = display.create_surface(client);
    let b = display.create_surface(client);

    display.set_focused_keyboard_surface(seat, Some(a));
    display.notify_keyboard_key(seat, 1, 30, KeyState::Pressed);
    display.set_focused_keyboard_surface(seat, Some(b));

    let events = display.take_events(client);
    let keyboard = keyboard_events(&events);
    assert!(matches!(keyboard[0], KeyboardEvent::Enter { surface, keys, .. }
        if *surface == a && keys.is_empty()));
    assert!(matches!(keyboard[1], KeyboardEvent::Modifiers { .. }));
    assert!(matches!(keyboard[2], KeyboardEvent::Key { key: 30, .. }));
    assert!(matches!(keyboard[3], KeyboardEvent::Leave { surface, .. } if *surface == a));
    assert!(matches!(keyboard[4], KeyboardEvent::Enter { surface, keys, .. }
        if *surface == b && keys == &vec![30]));
}

#[test]
fn touch_points_share_a_surface() {
    let mut display = Display::new();
    let client = display.create_client();
    let seat = display.create_seat_with_capabilities("seat0", Capability::TOUCH);
    let surface = display.create_surface(client);

    display.notify_touch_down(seat, surface, (100.0, 100.0).into(), 0, 1, (110.0, 110.0).into());
    display.notify_touch_down(seat, surface, (100.0, 100.0).into(), 1, 2, (120.0, 130.0).into());
    display.notify_touch_frame(seat);
    display.notify_touch_motion(seat, 1, 3, (125.0, 135.0).into());
    display.notify_touch_up(seat, 0, 4);
    display.notify_touch_up(seat, 1, 5);

    let events = display.take_events(client);
    let touch = touch_events(&events);
    assert!(matches!(touch[0], TouchEvent::Down { id: 0, position, .. }
        if *position == (10.0, 10.0).into()));
    assert!(matches!(touch[1], TouchEvent::Down { id: 1, position, .. }
        if *position == (20.0, 30.0).into()));
    assert!(matches!(touch[2], TouchEvent::Frame));
    assert!(matches!(touch[3], TouchEvent::Motion { id: 1, position, .. }
        if *position == (25.0, 35.0).into()));
    assert!(matches!(touch[4], TouchEvent::Up { id: 0, .. }));
    assert!(matches!(touch[5], TouchEvent::Up { id: 1, .. }));
}

#[test]
fn capability_updates_reach_every_client() {
    let mut display = Display::new();
    let a = display.create_client();
    let b = display.create_client();
    let seat = display.create_seat("seat0");

    display.seat_add_touch(seat);

    for client in [a, b] {
        let events = display.take_events(client);
        assert!(events.iter().any(|e| matches!(
            e,
            ClientEvent::Seat {
                event: SeatEvent::Capabilities { capabilities },
                ..
            } if *capabilities == Capability::TOUCH
        )));
    }
}
