// Open-addressed hash table with linear probing, used for the VM's globals.
//
// Mirrors the table structure this interpreter's C lineage uses: tombstones
// on delete so probe chains stay intact, a 0.75 max load factor, and FNV-1a
// string hashing (see `value::fnv1a_hash`).

use crate::value::{ObjString, Value};
use std::rc::Rc;

const MAX_LOAD: f64 = 0.75;

#[derive(Clone)]
enum Slot {
    Empty,
    Tombstone,
    Occupied(Rc<ObjString>, Value),
}

pub struct Table {
    entries: Vec<Slot>,
    count: usize, // live entries + tombstones
}

impl Table {
    pub fn new() -> Self {
        Self { entries: Vec::new(), count: 0 }
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn find_slot(entries: &[Slot], key: &str, capacity: usize) -> usize {
        let hash = crate::value::fnv1a_hash(key.as_bytes());
        let mut index = (hash as usize) % capacity;
        let mut tombstone: Option<usize> = None;
        loop {
            match &entries[index] {
                Slot::Empty => return tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Occupied(k, _) if k.bytes == key => return index,
                Slot::Occupied(..) => {}
            }
            index = (index + 1) % capacity;
        }
    }

    fn grow(&mut self) {
        let new_capacity = if self.entries.is_empty() { 8 } else { self.entries.len() * 2 };
        let mut new_entries = vec![Slot::Empty; 0];
        new_entries.resize_with(new_capacity, || Slot::Empty);

        let mut live_count = 0;
        for slot in self.entries.drain(..) {
            if let Slot::Occupied(key, value) = slot {
                let index = Self::find_slot(&new_entries, &key.bytes, new_capacity);
                new_entries[index] = Slot::Occupied(key, value);
                live_count += 1;
            }
        }
        self.entries = new_entries;
        self.count = live_count;
    }

    /// Inserts or overwrites `key`. Returns `true` if this created a new entry.
    pub fn set(&mut self, key: Rc<ObjString>, value: Value) -> bool {
        if self.capacity() == 0 || (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD {
            self.grow();
        }
        let capacity = self.capacity();
        let index = Self::find_slot(&self.entries, &key.bytes, capacity);
        let is_new = !matches!(self.entries[index], Slot::Occupied(..));
        if is_new {
            self.count += 1;
        }
        self.entries[index] = Slot::Occupied(key, value);
        is_new
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        if self.entries.is_empty() {
            return None;
        }
        let capacity = self.capacity();
        let index = Self::find_slot(&self.entries, key, capacity);
        match &self.entries[index] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let capacity = self.capacity();
        let index = Self::find_slot(&self.entries, key, capacity);
        if matches!(self.entries[index], Slot::Occupied(..)) {
            self.entries[index] = Slot::Tombstone;
            true
        } else {
            false
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|slot| match slot {
            Slot::Occupied(k, _) => Some(k.bytes.as_str()),
            _ => None,
        })
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::intern;

    #[test]
    fn set_then_get_round_trips() {
        let mut table = Table::new();
        table.set(intern("x"), Value::Number(1.0));
        assert!(matches!(table.get("x"), Some(Value::Number(n)) if *n == 1.0));
    }

    #[test]
    fn delete_then_get_reports_missing() {
        let mut table = Table::new();
        table.set(intern("y"), Value::Number(2.0));
        assert!(table.delete("y"));
        assert!(table.get("y").is_none());
    }

    #[test]
    fn overwrite_does_not_grow_count() {
        let mut table = Table::new();
        table.set(intern("z"), Value::Number(1.0));
        table.set(intern("z"), Value::Number(2.0));
        assert_eq!(table.count, 1);
    }

    #[test]
    fn survives_many_insertions_and_resizes() {
        let mut table = Table::new();
        for i in 0..200 {
            table.set(intern(&format!("key{}", i)), Value::Number(i as f64));
        }
        for i in 0..200 {
            let key = format!("key{}", i);
            assert!(matches!(table.get(&key), Some(Value::Number(n)) if *n == i as f64));
        }
    }

    #[test]
    fn tombstone_slot_is_reused_on_insert() {
        let mut table = Table::new();
        table.set(intern("a"), Value::Number(1.0));
        table.set(intern("b"), Value::Number(2.0));
        table.delete("a");
        let count_before = table.count;
        table.set(intern("c"), Value::Number(3.0));
        assert!(table.count <= count_before + 1);
    }
}
