//! Reply-tree reconstruction.
//!
//! Turns a flat page of messages into a forest using each message's
//! `parent_message_id`. This is an O(n) map-based grouping, independent of
//! the timestamp index.
//!
//! A parent that is not part of the page (for example one that fell on the
//! previous page) cannot be attached to, so its reply is returned as a root.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::Message;

/// A message together with the replies found in the same page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadNode {
    pub message: Message,
    pub replies: Vec<ThreadNode>,
}

/// Nest `messages` into reply trees.
///
/// Roots and replies keep the relative order of the input. Messages caught
/// in a parent cycle are unreachable from any root and are returned as
/// roots so none is dropped.
pub fn organize(messages: Vec<Message>) -> Vec<ThreadNode> {
    let index_by_id: HashMap<i64, usize> = messages
        .iter()
        .enumerate()
        .map(|(index, message)| (message.id, index))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); messages.len()];
    let mut roots: Vec<usize> = Vec::new();

    for (index, message) in messages.iter().enumerate() {
        match message
            .parent_message_id
            .and_then(|parent_id| index_by_id.get(&parent_id))
        {
            Some(&parent) if parent != index => children[parent].push(index),
            _ => roots.push(index),
        }
    }

    let mut slots: Vec<Option<Message>> = messages.into_iter().map(Some).collect();
    let mut forest: Vec<ThreadNode> = roots
        .into_iter()
        .filter_map(|root| build(root, &mut slots, &children))
        .collect();

    // Whatever is left sits on a parent cycle.
    for index in 0..slots.len() {
        if let Some(node) = build(index, &mut slots, &children) {
            forest.push(node);
        }
    }

    forest
}

fn build(index: usize, slots: &mut [Option<Message>], children: &[Vec<usize>]) -> Option<ThreadNode> {
    let message = slots[index].take()?;
    let replies = children[index]
        .iter()
        .filter_map(|&child| build(child, slots, children))
        .collect();
    Some(ThreadNode { message, replies })
}
