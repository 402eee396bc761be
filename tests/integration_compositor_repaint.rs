mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{Entry, Log, Recorder, blocking_dialog, config, drain, new_log, window};
use wintree::graphics::{PixelGraphics, PixelSurface};
use wintree::{Color, Event, Key, MouseButton, Point, Rect, WindowId, WindowSystem};

struct Grid {
    sys: WindowSystem,
    log: Log,
    child2: WindowId,
}

// Root (0,0,5,5) with three 1x1 children on the diagonal.
fn grid() -> Grid {
    let log = new_log();
    let mut sys = WindowSystem::new(config(5, 5));
    let root = window(&mut sys, None, Rect::new(0, 0, 5, 5), "root", &log);
    window(&mut sys, Some(root), Rect::new(1, 1, 1, 1), "child1", &log);
    let child2 = window(&mut sys, Some(root), Rect::new(2, 2, 1, 1), "child2", &log);
    window(&mut sys, Some(root), Rect::new(3, 3, 1, 1), "child3", &log);
    sys.update();
    drain(&log);
    Grid { sys, log, child2 }
}

fn paint(name: &'static str, x: i32, y: i32, w: i32, h: i32) -> Entry {
    Entry::Paint(name, Rect::new(x, y, w, h))
}

#[test]
fn invalidate_all_paints_parents_before_children() {
    let Grid { mut sys, log, .. } = grid();
    sys.invalidate_all();
    assert_eq!(sys.update(), 4);
    assert_eq!(
        drain(&log),
        vec![
            paint("root", 0, 0, 5, 5),
            paint("child1", 1, 1, 1, 1),
            paint("child2", 2, 2, 1, 1),
            paint("child3", 3, 3, 1, 1),
        ]
    );
}

#[test]
fn growing_a_window_repaints_what_it_now_covers() {
    let Grid {
        mut sys,
        log,
        child2,
    } = grid();
    sys.set_rect(child2, Rect::new(2, 2, 2, 2)).unwrap();
    sys.update();
    assert_eq!(
        drain(&log),
        vec![
            paint("root", 2, 2, 2, 2),
            paint("child2", 2, 2, 2, 2),
            paint("child3", 3, 3, 1, 1),
        ]
    );
}

#[test]
fn grow_then_shrink_still_repaints_exposed_area() {
    let Grid {
        mut sys,
        log,
        child2,
    } = grid();
    sys.set_rect(child2, Rect::new(1, 1, 3, 3)).unwrap();
    sys.set_rect(child2, Rect::new(2, 2, 1, 1)).unwrap();
    assert_eq!(sys.damage().as_slice(), &[Rect::new(1, 1, 3, 3)]);
    sys.update();
    assert_eq!(
        drain(&log),
        vec![
            paint("root", 1, 1, 3, 3),
            paint("child1", 1, 1, 1, 1),
            paint("child2", 2, 2, 1, 1),
            paint("child3", 3, 3, 1, 1),
        ]
    );
}

#[test]
fn moving_onto_a_sibling_repaints_old_and_new_position() {
    let Grid {
        mut sys,
        log,
        child2,
    } = grid();
    sys.move_window(child2, 3, 3).unwrap();
    sys.update();
    assert_eq!(
        drain(&log),
        vec![
            paint("root", 2, 2, 1, 1),
            paint("root", 3, 3, 1, 1),
            paint("child2", 3, 3, 1, 1),
            paint("child3", 3, 3, 1, 1),
        ]
    );
}

#[test]
fn unchanged_rect_paints_nothing() {
    let Grid {
        mut sys,
        log,
        child2,
    } = grid();
    sys.set_rect(child2, Rect::new(2, 2, 1, 1)).unwrap();
    assert!(sys.damage().is_empty());
    assert_eq!(sys.update(), 0);
    assert!(drain(&log).is_empty());
}

fn pixel_system(surface: &Rc<RefCell<PixelSurface>>) -> WindowSystem {
    WindowSystem::builder(config(8, 8))
        .graphics(PixelGraphics::new(Rc::clone(surface)))
        .build()
}

#[test]
fn raised_sibling_paints_last_over_the_overlap() {
    let log = new_log();
    let surface = Rc::new(RefCell::new(PixelSurface::new(8, 8)));
    let mut sys = pixel_system(&surface);
    let root = sys.create_window(None, Rect::new(0, 0, 8, 8)).unwrap();
    let first = sys.create_window(Some(root), Rect::new(0, 0, 4, 4)).unwrap();
    sys.set_handler(first, Recorder::new("first", &log).color(Color::RED))
        .unwrap();
    let second = sys.create_window(Some(root), Rect::new(2, 2, 4, 4)).unwrap();
    sys.set_handler(second, Recorder::new("second", &log).color(Color::BLUE))
        .unwrap();
    sys.update();
    assert_eq!(surface.borrow().pixel(3, 3), Some(Color::BLUE));
    drain(&log);

    sys.raise_top(first).unwrap();
    sys.invalidate_rect(Rect::new(2, 2, 2, 2)).unwrap();
    sys.update();
    let painted: Vec<&str> = drain(&log)
        .into_iter()
        .filter_map(|e| match e {
            Entry::Paint(name, _) => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(painted.last(), Some(&"first"));
    assert_eq!(surface.borrow().pixel(3, 3), Some(Color::RED));
    assert_eq!(sys.children(root).unwrap(), &[second, first]);

    // Already on top: no reorder, no damage.
    sys.raise_top(first).unwrap();
    assert!(sys.damage().is_empty());
}

#[test]
fn invalidating_twice_paints_the_same_pixels() {
    let build = |times: usize| {
        let log = new_log();
        let surface = Rc::new(RefCell::new(PixelSurface::new(8, 8)));
        let mut sys = pixel_system(&surface);
        let root = sys.create_window(None, Rect::new(0, 0, 8, 8)).unwrap();
        sys.set_handler(root, Recorder::new("root", &log).color(Color::GRAY))
            .unwrap();
        let child = sys.create_window(Some(root), Rect::new(2, 1, 4, 3)).unwrap();
        sys.set_handler(child, Recorder::new("child", &log).color(Color::GREEN))
            .unwrap();
        sys.update();
        surface.borrow_mut().fill(Rect::new(0, 0, 8, 8), Color::BLACK);
        for _ in 0..times {
            sys.invalidate_rect(Rect::new(1, 1, 4, 4)).unwrap();
        }
        sys.update();
        let pixels = surface.borrow().pixels().to_vec();
        pixels
    };
    assert_eq!(build(1), build(2));
}

#[test]
fn failed_paint_keeps_damage_for_the_next_update() {
    let log = new_log();
    let surface = Rc::new(RefCell::new(PixelSurface::new(8, 8)));
    let mut sys = pixel_system(&surface);
    let root = window(&mut sys, None, Rect::new(0, 0, 8, 8), "root", &log);
    window(&mut sys, Some(root), Rect::new(1, 1, 2, 2), "child", &log);

    surface.borrow_mut().lock().unwrap();
    assert_eq!(sys.update(), 0);
    assert_eq!(sys.damage().as_slice(), &[Rect::new(0, 0, 8, 8)]);
    assert!(drain(&log).is_empty());

    surface.borrow_mut().unlock();
    assert_eq!(sys.update(), 2);
    assert!(sys.damage().is_empty());
    assert_eq!(
        drain(&log),
        vec![
            Entry::Paint("root", Rect::new(0, 0, 8, 8)),
            Entry::Paint("child", Rect::new(1, 1, 2, 2)),
        ]
    );
}

#[test]
fn hidden_and_detached_windows_are_not_painted() {
    let Grid {
        mut sys,
        log,
        child2,
    } = grid();
    sys.hide(child2).unwrap();
    sys.update();
    assert_eq!(drain(&log), vec![paint("root", 2, 2, 1, 1)]);

    sys.show(child2).unwrap();
    sys.detach(child2).unwrap();
    sys.invalidate_all();
    sys.update();
    assert!(!drain(&log).iter().any(|e| matches!(e, Entry::Paint("child2", _))));
}

#[test]
fn clipping_parent_limits_child_paint() {
    let log = new_log();
    let mut sys = WindowSystem::new(config(10, 10));
    let root = window(&mut sys, None, Rect::new(0, 0, 10, 10), "root", &log);
    let panel = window(&mut sys, Some(root), Rect::new(2, 2, 4, 4), "panel", &log);
    window(&mut sys, Some(panel), Rect::new(2, 2, 4, 4), "inner", &log);
    sys.update();
    assert_eq!(
        drain(&log),
        vec![
            paint("root", 0, 0, 10, 10),
            paint("panel", 2, 2, 4, 4),
            paint("inner", 4, 4, 2, 2),
        ]
    );
}

#[test]
fn destroying_a_window_repaints_what_was_under_it() {
    let Grid {
        mut sys,
        log,
        child2,
    } = grid();
    sys.destroy_window(child2).unwrap();
    assert_eq!(drain(&log), vec![Entry::Destroy("child2")]);
    sys.update();
    assert_eq!(drain(&log), vec![paint("root", 2, 2, 1, 1)]);
    assert!(!sys.is_alive(child2));
}

#[test]
fn window_running_a_blocking_modal_repaints_what_the_dialog_vacated() {
    let log = new_log();
    let (mut sys, _desktop, dialog) = blocking_dialog(
        vec![
            Event::mouse_down(1, 1, MouseButton::Left),
            Event::key_down(Key::Enter),
        ],
        &log,
    );
    sys.run().unwrap();
    assert!(!sys.is_shown(dialog));
    assert!(sys.damage().is_empty());

    let entries = drain(&log);
    let returned = entries
        .iter()
        .position(|e| *e == Entry::Returned("desktop", 1))
        .unwrap();
    assert!(entries[returned..].contains(&paint("desktop", 4, 4, 3, 3)));
}

#[test]
fn reparenting_repaints_old_and_new_position() {
    let log = new_log();
    let mut sys = WindowSystem::new(config(10, 10));
    let root = window(&mut sys, None, Rect::new(0, 0, 10, 10), "root", &log);
    let left = window(&mut sys, Some(root), Rect::new(0, 0, 4, 4), "left", &log);
    let right = window(&mut sys, Some(root), Rect::new(5, 5, 4, 4), "right", &log);
    let item = window(&mut sys, Some(left), Rect::new(1, 1, 2, 2), "item", &log);
    sys.update();
    drain(&log);

    sys.set_parent(item, Some(right)).unwrap();
    assert_eq!(sys.absolute_rect(item).unwrap(), Rect::new(6, 6, 2, 2));
    sys.update();
    assert_eq!(
        drain(&log),
        vec![
            paint("root", 1, 1, 2, 2),
            paint("left", 1, 1, 2, 2),
            paint("root", 6, 6, 2, 2),
            paint("right", 6, 6, 2, 2),
            paint("item", 6, 6, 2, 2),
        ]
    );
    assert_eq!(sys.children(left).unwrap(), &[] as &[WindowId]);
}

#[test]
fn lowered_sibling_paints_first_under_the_overlap() {
    let log = new_log();
    let surface = Rc::new(RefCell::new(PixelSurface::new(8, 8)));
    let mut sys = pixel_system(&surface);
    let root = sys.create_window(None, Rect::new(0, 0, 8, 8)).unwrap();
    sys.set_handler(root, Recorder::new("root", &log).color(Color::GRAY))
        .unwrap();
    let first = sys.create_window(Some(root), Rect::new(0, 0, 4, 4)).unwrap();
    sys.set_handler(first, Recorder::new("first", &log).color(Color::RED))
        .unwrap();
    let second = sys.create_window(Some(root), Rect::new(2, 2, 4, 4)).unwrap();
    sys.set_handler(second, Recorder::new("second", &log).color(Color::BLUE))
        .unwrap();
    sys.update();
    drain(&log);

    sys.lower_bottom(second).unwrap();
    assert_eq!(sys.damage().as_slice(), &[Rect::new(2, 2, 4, 4)]);
    sys.update();
    assert_eq!(
        drain(&log),
        vec![
            paint("root", 2, 2, 4, 4),
            paint("second", 2, 2, 4, 4),
            paint("first", 2, 2, 2, 2),
        ]
    );
    assert_eq!(surface.borrow().pixel(3, 3), Some(Color::RED));
    assert_eq!(surface.borrow().pixel(5, 5), Some(Color::BLUE));
    assert_eq!(sys.children(root).unwrap(), &[second, first]);

    sys.lower_bottom(second).unwrap();
    assert!(sys.damage().is_empty());
}

#[test]
fn scrolled_parent_moves_child_paint_and_hit_testing() {
    let log = new_log();
    let mut sys = WindowSystem::new(config(10, 10));
    let root = window(&mut sys, None, Rect::new(0, 0, 10, 10), "root", &log);
    let panel = window(&mut sys, Some(root), Rect::new(2, 2, 6, 6), "panel", &log);
    let item = window(&mut sys, Some(panel), Rect::new(1, 4, 2, 2), "item", &log);
    sys.update();
    drain(&log);
    assert_eq!(sys.absolute_rect(item).unwrap(), Rect::new(3, 6, 2, 2));

    sys.set_origin(panel, Point::new(0, 3)).unwrap();
    assert_eq!(sys.absolute_rect(item).unwrap(), Rect::new(3, 3, 2, 2));
    sys.update();
    let painted: Vec<Entry> = drain(&log)
        .into_iter()
        .filter(|e| matches!(e, Entry::Paint("item", _)))
        .collect();
    assert_eq!(painted, vec![paint("item", 3, 3, 2, 2)]);

    assert_eq!(sys.window_at(3, 3), Some(item));
    assert_eq!(sys.window_at(3, 6), Some(panel));
    sys.push_event(Event::mouse_down(4, 4, MouseButton::Left));
    assert!(sys.step().unwrap());
    assert!(drain(&log).contains(&Entry::Down("item", 1, 1)));
}
