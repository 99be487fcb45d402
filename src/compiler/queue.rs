//! Forward-patch instruction queue.
//!
//! Instructions emitted inside an `if` or `while` are held here until the
//! enclosing construct is closed, so that conditional jumps whose targets
//! depend on the body length can be spliced in after the condition.
//!
//! Nodes live in an arena and are linked by index. A [`NodeHandle`] records
//! which queue issued it and in which generation (generations advance on
//! every drain), so a handle can only be used with the queue that produced
//! it, and only until that queue is drained.

use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

use crate::vm::Instruction;

static NEXT_QUEUE_ID: AtomicU32 = AtomicU32::new(0);

/// Position of an instruction inside an [`InstructionQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle {
    queue: u32,
    generation: u32,
    index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue handle belongs to a different queue")]
    ForeignHandle,
    #[error("queue handle was invalidated by a drain")]
    StaleHandle,
}

#[derive(Debug)]
struct Node {
    instruction: Instruction,
    next: Option<usize>,
}

#[derive(Debug)]
pub struct InstructionQueue {
    id: u32,
    generation: u32,
    nodes: Vec<Node>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl Default for InstructionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionQueue {
    pub fn new() -> Self {
        Self {
            id: NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            nodes: Vec::new(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handle to the last instruction, if any.
    pub fn tail(&self) -> Option<NodeHandle> {
        self.tail.map(|index| self.handle(index))
    }

    /// Append an instruction.
    pub fn enqueue(&mut self, instruction: Instruction) -> NodeHandle {
        let index = self.alloc(instruction, None);
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.handle(index)
    }

    /// Insert an instruction before every queued instruction.
    pub fn push_front(&mut self, instruction: Instruction) -> NodeHandle {
        let index = self.alloc(instruction, self.head);
        self.head = Some(index);
        if self.tail.is_none() {
            self.tail = Some(index);
        }
        self.handle(index)
    }

    /// Insert an instruction directly after `after`.
    pub fn insert_after(
        &mut self,
        after: NodeHandle,
        instruction: Instruction,
    ) -> Result<NodeHandle, QueueError> {
        if after.queue != self.id {
            return Err(QueueError::ForeignHandle);
        }
        if after.generation != self.generation || after.index >= self.nodes.len() {
            return Err(QueueError::StaleHandle);
        }

        let next = self.nodes[after.index].next;
        let index = self.alloc(instruction, next);
        self.nodes[after.index].next = Some(index);
        if self.tail == Some(after.index) {
            self.tail = Some(index);
        }
        Ok(self.handle(index))
    }

    /// Instructions in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> + '_ {
        std::iter::successors(self.head, |&index| self.nodes[index].next)
            .map(|index| &self.nodes[index].instruction)
    }

    /// Hand every instruction to `sink` in order and empty the queue.
    ///
    /// A failing instruction does not stop the drain; the first error is
    /// returned once every instruction has been offered.
    pub fn drain<E>(
        &mut self,
        mut sink: impl FnMut(Instruction) -> Result<(), E>,
    ) -> Result<usize, E> {
        let order: Vec<Instruction> = self.iter().copied().collect();
        self.nodes.clear();
        self.head = None;
        self.tail = None;
        self.generation = self.generation.wrapping_add(1);

        let mut first_error = None;
        for instruction in &order {
            if let Err(e) = sink(*instruction) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(order.len()),
        }
    }

    fn alloc(&mut self, instruction: Instruction, next: Option<usize>) -> usize {
        self.nodes.push(Node { instruction, next });
        self.nodes.len() - 1
    }

    fn handle(&self, index: usize) -> NodeHandle {
        NodeHandle {
            queue: self.id,
            generation: self.generation,
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Opcode;

    fn lit(m: i32) -> Instruction {
        Instruction::new(Opcode::Lit, 0, 0, m)
    }

    fn values(queue: &InstructionQueue) -> Vec<i32> {
        queue.iter().map(|i| i.m).collect()
    }

    #[test]
    fn test_enqueue_preserves_order() {
        let mut queue = InstructionQueue::new();
        for m in 0..4 {
            queue.enqueue(lit(m));
        }
        assert_eq!(values(&queue), vec![0, 1, 2, 3]);
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_insert_after_middle_and_tail() {
        let mut queue = InstructionQueue::new();
        let first = queue.enqueue(lit(1));
        let last = queue.enqueue(lit(3));

        queue.insert_after(first, lit(2)).unwrap();
        assert_eq!(values(&queue), vec![1, 2, 3]);

        queue.insert_after(last, lit(4)).unwrap();
        assert_eq!(values(&queue), vec![1, 2, 3, 4]);

        queue.enqueue(lit(5));
        assert_eq!(values(&queue), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_push_front() {
        let mut queue = InstructionQueue::new();
        queue.push_front(lit(2));
        queue.push_front(lit(1));
        queue.enqueue(lit(3));
        assert_eq!(values(&queue), vec![1, 2, 3]);
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut a = InstructionQueue::new();
        let mut b = InstructionQueue::new();
        let handle = a.enqueue(lit(1));
        b.enqueue(lit(1));

        assert_eq!(b.insert_after(handle, lit(2)), Err(QueueError::ForeignHandle));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut queue = InstructionQueue::new();
        let handle = queue.enqueue(lit(1));
        queue.drain(|_| Ok::<(), ()>(())).unwrap();
        queue.enqueue(lit(2));

        assert_eq!(queue.insert_after(handle, lit(3)), Err(QueueError::StaleHandle));
    }

    #[test]
    fn test_drain_is_fifo_and_empties() {
        let mut queue = InstructionQueue::new();
        let first = queue.enqueue(lit(1));
        queue.enqueue(lit(3));
        queue.insert_after(first, lit(2)).unwrap();

        let mut out = Vec::new();
        let count = queue
            .drain(|inst| {
                out.push(inst.m);
                Ok::<(), ()>(())
            })
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(out, vec![1, 2, 3]);
        assert!(queue.is_empty());
        assert!(queue.tail().is_none());
    }

    #[test]
    fn test_drain_continues_after_failure() {
        let mut queue = InstructionQueue::new();
        for m in 0..4 {
            queue.enqueue(lit(m));
        }

        let mut seen = Vec::new();
        let result = queue.drain(|inst| {
            seen.push(inst.m);
            if inst.m % 2 == 1 { Err(inst.m) } else { Ok(()) }
        });
        assert_eq!(result, Err(1));
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }
}
