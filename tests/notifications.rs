//! Change notification: ordering, propagation, veto and interference.

#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::rc::Rc;

use xmlgrove::notify::{ChangeEvent, ChangeKind, ChangePhase, ObjectRef};
use xmlgrove::{NodeId, QName, Tree, TreeError};

type Log = Rc<RefCell<Vec<(&'static str, ChangeEvent)>>>;

/// Registers `Changing` and `Changed` observers on `target` that append to
/// the returned log, tagged with `label`.
fn watch(tree: &mut Tree, target: impl Into<ObjectRef> + Copy, label: &'static str, log: &Log) {
    for phase in [ChangePhase::Changing, ChangePhase::Changed] {
        let log = Rc::clone(log);
        tree.observe(target, phase, move |_, event| {
            log.borrow_mut().push((label, *event));
            Ok(())
        });
    }
}

fn nested(tree: &mut Tree) -> (NodeId, NodeId) {
    let root = tree.new_element("root").unwrap();
    let child = tree.new_element("child").unwrap();
    tree.add(root, child).unwrap();
    (root, child)
}

#[test]
fn test_events_bracket_the_change_and_bubble_up() {
    let mut tree = Tree::new();
    let (root, child) = nested(&mut tree);
    let log: Log = Rc::default();
    watch(&mut tree, root, "root", &log);
    watch(&mut tree, child, "child", &log);

    let leaf = tree.new_element("leaf").unwrap();
    tree.add(child, leaf).unwrap();

    let seen: Vec<(&str, ChangePhase)> = log.borrow().iter().map(|(l, e)| (*l, e.phase)).collect();
    assert_eq!(
        seen,
        vec![
            ("child", ChangePhase::Changing),
            ("root", ChangePhase::Changing),
            ("child", ChangePhase::Changed),
            ("root", ChangePhase::Changed),
        ]
    );
    assert!(log
        .borrow()
        .iter()
        .all(|(_, e)| e.kind == ChangeKind::Add && e.sender == ObjectRef::Node(leaf)));
}

#[test]
fn test_attribute_changes_reach_the_attribute_and_its_element() {
    let mut tree = Tree::new();
    let (root, child) = nested(&mut tree);
    tree.set_attribute_value(child, "state", Some("old")).unwrap();
    let attr = tree.attribute(child, &QName::new("state")).unwrap();

    let log: Log = Rc::default();
    watch(&mut tree, attr, "attr", &log);
    watch(&mut tree, root, "root", &log);
    tree.set_attribute_value(child, "state", Some("new")).unwrap();

    let labels: Vec<&str> = log.borrow().iter().map(|(l, _)| *l).collect();
    assert_eq!(labels, vec!["attr", "root", "attr", "root"]);
    assert!(log
        .borrow()
        .iter()
        .all(|(_, e)| e.kind == ChangeKind::Value && e.sender == ObjectRef::Attribute(attr)));
}

#[test]
fn test_rename_and_remove_kinds() {
    let mut tree = Tree::new();
    let (root, child) = nested(&mut tree);
    let log: Log = Rc::default();
    watch(&mut tree, root, "root", &log);

    tree.set_name(child, "renamed").unwrap();
    tree.remove(child).unwrap();

    let kinds: Vec<(ChangeKind, ObjectRef)> = log
        .borrow()
        .iter()
        .filter(|(_, e)| e.phase == ChangePhase::Changed)
        .map(|(_, e)| (e.kind, e.sender))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (ChangeKind::Name, ObjectRef::Node(child)),
            (ChangeKind::Remove, ObjectRef::Node(child)),
        ]
    );
}

#[test]
fn test_changing_observer_can_veto() {
    let mut tree = Tree::new();
    let (root, child) = nested(&mut tree);
    tree.observe(root, ChangePhase::Changing, |_, event| match event.kind {
        ChangeKind::Remove => Err(TreeError::Rejected("children are permanent".to_string())),
        _ => Ok(()),
    });

    assert_eq!(
        tree.remove(child),
        Err(TreeError::Rejected("children are permanent".to_string()))
    );
    assert_eq!(tree.parent(child), Some(root));
    assert!(tree.remove_nodes(root).is_err());
    assert_eq!(tree.nodes(root).count(), 1);

    // other kinds still go through
    tree.set_value(child, "text").unwrap();
    assert_eq!(tree.value(child), "text");
}

#[test]
fn test_observer_moving_the_node_is_detected() {
    let mut tree = Tree::new();
    let (root, _) = nested(&mut tree);
    let elsewhere = tree.new_element("elsewhere").unwrap();
    tree.observe(root, ChangePhase::Changing, move |tree, event| {
        if let (ChangeKind::Add, ObjectRef::Node(node)) = (event.kind, event.sender) {
            if tree.parent(node).is_none() {
                tree.add_node(elsewhere, node)?;
            }
        }
        Ok(())
    });

    let newcomer = tree.new_element("newcomer").unwrap();
    assert!(matches!(
        tree.add(root, newcomer),
        Err(TreeError::ExternalMutation { .. })
    ));
    assert_eq!(tree.parent(newcomer), Some(elsewhere));
    assert_eq!(tree.nodes(root).count(), 1);
}

#[test]
fn test_observer_removing_the_node_is_detected() {
    let mut tree = Tree::new();
    let (root, child) = nested(&mut tree);
    let reentered = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&reentered);
    tree.observe(child, ChangePhase::Changing, move |tree, event| {
        if event.kind == ChangeKind::Remove && !*flag.borrow() {
            *flag.borrow_mut() = true;
            if let ObjectRef::Node(node) = event.sender {
                tree.remove(node)?;
            }
        }
        Ok(())
    });

    let leaf = tree.new_element("leaf").unwrap();
    tree.add(child, leaf).unwrap();
    assert!(matches!(tree.remove(leaf), Err(TreeError::ExternalMutation { .. })));
    assert_eq!(tree.parent(leaf), None);
    assert_eq!(tree.parent(child), Some(root));
}

#[test]
fn test_unobserve_stops_delivery() {
    let mut tree = Tree::new();
    let (root, child) = nested(&mut tree);
    let count = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&count);
    let id = tree.observe(root, ChangePhase::Changed, move |_, _| {
        *counter.borrow_mut() += 1;
        Ok(())
    });
    tree.set_value(child, "a").unwrap();
    assert!(tree.unobserve(id));
    assert!(!tree.unobserve(id));
    tree.set_value(child, "b").unwrap();
    assert!(*count.borrow() > 0);
    let after_first = *count.borrow();
    tree.set_value(child, "c").unwrap();
    assert_eq!(*count.borrow(), after_first);
    assert!(!tree.has_observers());
}

#[test]
fn test_detached_subtrees_are_silent() {
    let mut tree = Tree::new();
    let (root, _) = nested(&mut tree);
    let log: Log = Rc::default();
    watch(&mut tree, root, "root", &log);

    let other = tree.new_element("other").unwrap();
    tree.add(other, "text").unwrap();
    tree.set_attribute_value(other, "x", Some("1")).unwrap();
    assert!(log.borrow().is_empty());
}
