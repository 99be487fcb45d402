//! Activation-record stack.
//!
//! Records live in an arena owned by [`RecordStack`] and refer to each other
//! through [`RecordId`] handles. Records are pushed by `CAL` and popped by
//! `RTN` in strict LIFO order, so the arena index of a record never changes
//! while it is live.

use super::INT_OFFSET;

/// Handle to a live activation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(usize);

impl RecordId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One frame of the activation-record stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationRecord {
    pub locals: Vec<i32>,
    pub return_value: i32,
    pub return_address: i32,
    /// Lexically enclosing record, followed by `LOD`/`STO`/`CAL` level walks.
    pub static_link: Option<RecordId>,
    /// Caller record, restored on `RTN`.
    pub dynamic_link: Option<RecordId>,
}

impl ActivationRecord {
    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Resolve a frame slot to a storage cell.
    ///
    /// Slot 0 is the return value; slot `m >= INT_OFFSET` is
    /// `locals[m - INT_OFFSET]`. Anything else is `None`.
    pub fn slot(&self, m: i32) -> Option<&i32> {
        if m == 0 {
            return Some(&self.return_value);
        }
        let index = usize::try_from(m.checked_sub(INT_OFFSET)?).ok()?;
        self.locals.get(index)
    }

    pub fn slot_mut(&mut self, m: i32) -> Option<&mut i32> {
        if m == 0 {
            return Some(&mut self.return_value);
        }
        let index = usize::try_from(m.checked_sub(INT_OFFSET)?).ok()?;
        self.locals.get_mut(index)
    }
}

#[derive(Debug, Default)]
pub struct RecordStack {
    records: Vec<ActivationRecord>,
    current: Option<RecordId>,
}

impl RecordStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a record whose dynamic link is the current record. The new
    /// record becomes current.
    pub fn push(&mut self, return_address: i32, static_link: Option<RecordId>) -> RecordId {
        let id = RecordId(self.records.len());
        self.records.push(ActivationRecord {
            locals: Vec::new(),
            return_value: 0,
            return_address,
            static_link,
            dynamic_link: self.current,
        });
        self.current = Some(id);
        id
    }

    /// Pop the current record and return its return value.
    pub fn pop(&mut self) -> Option<i32> {
        let record = self.records.pop()?;
        self.current = record.dynamic_link;
        Some(record.return_value)
    }

    pub fn current(&self) -> Option<RecordId> {
        self.current
    }

    pub fn get(&self, id: RecordId) -> Option<&ActivationRecord> {
        self.records.get(id.0)
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut ActivationRecord> {
        self.records.get_mut(id.0)
    }

    /// Follow static links `levels` times starting from the current record.
    pub fn static_parent(&self, levels: i32) -> Option<RecordId> {
        self.walk(levels, |record| record.static_link)
    }

    /// Follow dynamic links `levels` times starting from the current record.
    pub fn dynamic_parent(&self, levels: i32) -> Option<RecordId> {
        self.walk(levels, |record| record.dynamic_link)
    }

    fn walk(&self, levels: i32, link: impl Fn(&ActivationRecord) -> Option<RecordId>) -> Option<RecordId> {
        if levels < 0 {
            return None;
        }
        let mut id = self.current?;
        for _ in 0..levels {
            id = link(self.get(id)?)?;
        }
        Some(id)
    }

    /// Allocate `count` zeroed locals in a record.
    ///
    /// Returns `false` if the record already owns locals. A count below one
    /// allocates nothing.
    pub fn allocate_locals(&mut self, id: RecordId, count: i32) -> bool {
        let Some(record) = self.get_mut(id) else {
            return false;
        };
        if !record.locals.is_empty() {
            return false;
        }
        if count > 0 {
            record.locals = vec![0; count as usize];
        }
        true
    }

    pub fn depth(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records from the outermost to the current one.
    pub fn iter(&self) -> std::slice::Iter<'_, ActivationRecord> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.current = None;
    }
}
