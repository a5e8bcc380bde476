/*!

  Symbolic names for relative-branch targets. A target is named once, on
  the first reference that renders it, and every later reference reuses the
  stored name. Names are synthesized from the target's virtual address, so
  they are stable across runs regardless of discovery order. Absolute
  jump/call targets are never labeled; they render their literal address.

*/

use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::address::Address;

pub struct LabelTable {
  table: BiMap<Address, DefaultAtom>,
}

impl LabelTable {

  pub fn new() -> LabelTable {
    LabelTable {
      table: BiMap::new()
    }
  }

  /// Name bound to the target, creating it on first use.
  pub fn intern(&mut self, target: Address) -> DefaultAtom {
    if let Some(name) = self.table.get_by_left(&target) {
      return name.clone();
    }
    let name = DefaultAtom::from(format!("label_{}", target).as_str());
    self.table.insert(target, name.clone());
    name
  }

  /// Name bound to the target, if any reference has interned one.
  pub fn get(&self, target: &Address) -> Option<&DefaultAtom> {
    self.table.get_by_left(target)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_derive_from_the_address() {
    let mut labels = LabelTable::new();
    assert_eq!(&*labels.intern(Address(0x0105)), "label_0x0105");
    assert_eq!(&*labels.intern(Address(0x0fd)), "label_0x00fd");
  }

  #[test]
  fn interning_twice_reuses_the_name() {
    let mut labels = LabelTable::new();
    let first = labels.intern(Address(0x0104));
    let second = labels.intern(Address(0x0104));
    assert_eq!(first, second);
    assert_eq!(labels.len(), 1);
  }

  #[test]
  fn get_does_not_allocate() {
    let mut labels = LabelTable::new();
    assert!(labels.get(&Address(0x0105)).is_none());
    assert!(labels.is_empty());
    labels.intern(Address(0x0105));
    assert!(labels.get(&Address(0x0105)).is_some());
  }
}
