//! Reply trees for comment threads.
//!
//! A comment hangs under its parent only when the parent is present and
//! belongs to the same post; otherwise it is shown at the top level. Parent
//! chains that loop back on themselves are cut at the earliest comment of
//! the loop, so every comment is emitted exactly once. Siblings are ordered
//! by creation time, ties broken by id.

use inkpost_orm::Comment;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thread<T> {
    #[serde(flatten)]
    pub item: T,
    pub replies: Vec<Thread<T>>,
}

impl<T> Thread<T> {
    /// Number of items in this thread, itself included
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(thread) = stack.pop() {
            count += 1;
            stack.extend(thread.replies.iter());
        }
        count
    }
}

/// Arrange `comments` into threads, converting each one with `convert`
pub fn build_threads<T, F>(mut comments: Vec<Comment>, mut convert: F) -> Vec<Thread<T>>
where
    F: FnMut(Comment) -> T,
{
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let index: HashMap<i64, usize> = comments.iter().enumerate().map(|(i, c)| (c.id, i)).collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut attached = vec![false; comments.len()];
    for (i, comment) in comments.iter().enumerate() {
        let parent = comment
            .parent_id
            .and_then(|id| index.get(&id).copied())
            .filter(|&p| p != i && comments[p].post_id == comment.post_id);
        if let Some(p) = parent {
            children[p].push(i);
            attached[i] = true;
        }
    }

    // Depth-first from the natural roots, then from whatever a loop kept
    // unreachable, in creation order.
    let mut visited = vec![false; comments.len()];
    let mut preorder = Vec::with_capacity(comments.len());
    let mut tree_children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots = Vec::new();

    let starts = (0..comments.len())
        .filter(|&i| !attached[i])
        .chain((0..comments.len()).filter(|&i| attached[i]));
    for start in starts {
        if visited[start] {
            continue;
        }
        let mut stack: Vec<(usize, Option<usize>)> = vec![(start, None)];
        while let Some((node, parent)) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            preorder.push(node);
            match parent {
                Some(p) => tree_children[p].push(node),
                None => roots.push(node),
            }
            for &child in children[node].iter().rev() {
                if !visited[child] {
                    stack.push((child, Some(node)));
                }
            }
        }
    }
    roots.sort_unstable();

    let mut items: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    let mut built: Vec<Option<Thread<T>>> = (0..items.len()).map(|_| None).collect();
    for &node in preorder.iter().rev() {
        let replies = tree_children[node]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        if let Some(comment) = items[node].take() {
            built[node] = Some(Thread {
                item: convert(comment),
                replies,
            });
        }
    }

    roots.into_iter().filter_map(|root| built[root].take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use inkpost_orm::CommentStatus;

    fn comment(id: i64, post_id: i64, parent_id: Option<i64>, minute: i64) -> Comment {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minute);
        Comment {
            id,
            post_id,
            parent_id,
            author_name: format!("author {}", id),
            author_email: "a@example.com".into(),
            content: format!("comment {}", id),
            status: CommentStatus::Approved,
            moderated_content: None,
            ip_address: None,
            user_agent: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn ids(threads: &[Thread<i64>]) -> Vec<i64> {
        threads.iter().map(|t| t.item).collect()
    }

    fn total(threads: &[Thread<i64>]) -> usize {
        threads.iter().map(Thread::size).sum()
    }

    #[test]
    fn test_replies_nest_under_parents() {
        let comments = vec![
            comment(3, 1, Some(1), 2),
            comment(1, 1, None, 0),
            comment(2, 1, None, 1),
            comment(4, 1, Some(3), 3),
        ];
        let threads = build_threads(comments, |c| c.id);

        assert_eq!(ids(&threads), vec![1, 2]);
        assert_eq!(ids(&threads[0].replies), vec![3]);
        assert_eq!(ids(&threads[0].replies[0].replies), vec![4]);
        assert!(threads[1].replies.is_empty());
    }

    #[test]
    fn test_orphans_and_cross_post_parents_are_promoted() {
        let comments = vec![
            comment(1, 1, None, 0),
            comment(2, 1, Some(99), 1),
            comment(3, 2, None, 2),
            comment(4, 2, Some(1), 3),
        ];
        let threads = build_threads(comments, |c| c.id);

        assert_eq!(ids(&threads), vec![1, 2, 3, 4]);
        assert!(threads.iter().all(|t| t.replies.is_empty()));
    }

    #[test]
    fn test_self_parent_becomes_root() {
        let threads = build_threads(vec![comment(5, 1, Some(5), 0)], |c| c.id);
        assert_eq!(ids(&threads), vec![5]);
        assert!(threads[0].replies.is_empty());
    }

    #[test]
    fn test_cycles_are_broken_and_nothing_is_lost() {
        // 1 -> 2 -> 3 -> 1, plus a healthy root with a reply
        let comments = vec![
            comment(1, 1, Some(3), 1),
            comment(2, 1, Some(1), 2),
            comment(3, 1, Some(2), 3),
            comment(10, 1, None, 0),
            comment(11, 1, Some(10), 4),
        ];
        let threads = build_threads(comments, |c| c.id);

        assert_eq!(total(&threads), 5);
        assert_eq!(ids(&threads), vec![10, 1]);
        assert_eq!(ids(&threads[1].replies), vec![2]);
        assert_eq!(ids(&threads[1].replies[0].replies), vec![3]);
        assert!(threads[1].replies[0].replies[0].replies.is_empty());
    }

    #[test]
    fn test_siblings_ordered_by_time_then_id() {
        let comments = vec![
            comment(1, 1, None, 0),
            comment(7, 1, Some(1), 5),
            comment(6, 1, Some(1), 5),
            comment(5, 1, Some(1), 9),
            comment(8, 1, Some(1), 1),
        ];
        let threads = build_threads(comments, |c| c.id);
        assert_eq!(ids(&threads[0].replies), vec![8, 6, 7, 5]);
    }

    #[test]
    fn test_long_reply_chain() {
        let comments: Vec<_> = (1..=1_000)
            .map(|id| comment(id, 1, if id == 1 { None } else { Some(id - 1) }, id))
            .collect();
        let threads = build_threads(comments, |c| c.id);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].size(), 1_000);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_threads(Vec::new(), |c| c.id).is_empty());
    }
}
