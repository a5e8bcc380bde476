/*!

  The e-Reader firmware exposes its built-in routines through two reserved
  one byte opcodes, `rst 0x00` and `rst 0x08`. By convention the byte
  following the vector is not code; it selects the routine. The catalog
  below maps (vector, selector) pairs to the routine's symbolic name so the
  renderer can emit `.db ER_API_FadeIn` instead of an anonymous data byte,
  and so the definitions unit can declare every known name for the
  assembler.

  Names are interned; they are repeated once per call site in the output.

*/

use std::fmt::{Display, Formatter};

use bimap::BiMap;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use string_cache::DefaultAtom;
use strum_macros::{Display as StrumDisplay, IntoStaticStr};

/// The two software-call vector opcodes.
#[derive(
TryFromPrimitive, IntoPrimitive,
Clone,            Copy,          Eq, PartialEq, Debug, Hash
)]
#[repr(u8)]
pub enum Vector {
  Rst00 = 0xc7,
  Rst08 = 0xcf,
}

impl Display for Vector {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Vector::Rst00 => write!(f, "rst 0x00"),
      Vector::Rst08 => write!(f, "rst 0x08"),
    }
  }
}

/// Routine selectors known for `rst 0x00`, with their published names.
#[derive(
StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,    Debug,         Hash
)]
#[repr(u8)]
pub enum ErApi {
  #[strum(serialize = "ER_API_FadeIn")]
  FadeIn = 0x00,
}

impl ErApi {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }
}

/**
  The catalog of known API routines, a mapping between (vector, selector)
  pairs and routine names. Really just a convenience wrapper around a
  `BiMap`. The default catalog holds the published entries; a custom one
  can be injected when constructing the engine.
*/
pub struct ApiCatalog {
  table: BiMap<(Vector, u8), DefaultAtom>,
}

impl ApiCatalog {

  pub fn new() -> ApiCatalog {
    ApiCatalog {
      table: BiMap::new()
    }
  }

  pub fn insert(&mut self, vector: Vector, selector: u8, name: &str) {
    self.table.insert((vector, selector), DefaultAtom::from(name));
  }

  pub fn lookup(&self, vector: Vector, selector: u8) -> Option<&DefaultAtom> {
    self.table.get_by_left(&(vector, selector))
  }

  /// One `name = 0xHH` declaration per entry, sorted by selector code, in
  /// the form the definitions unit is assembled from.
  pub fn definitions(&self) -> String {
    let mut entries: Vec<(u8, &DefaultAtom)> =
      self.table.iter().map(|(key, name)| (key.1, name)).collect();
    entries.sort_by(|a, b| {
      a.0.cmp(&b.0).then_with(|| AsRef::<str>::as_ref(a.1).cmp(b.1.as_ref()))
    });
    entries
      .iter()
      .map(|(selector, name)| format!("    {} = 0x{:02x}", name, selector))
      .collect::<Vec<String>>()
      .join("\n")
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }
}

impl Default for ApiCatalog {
  fn default() -> ApiCatalog {
    let mut catalog = ApiCatalog::new();
    catalog.insert(Vector::Rst00, ErApi::FadeIn.code(), ErApi::FadeIn.into());
    catalog
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::convert::TryFrom;

  #[test]
  fn vector_from_opcode_byte() {
    assert_eq!(Vector::try_from(0xc7).ok(), Some(Vector::Rst00));
    assert_eq!(Vector::try_from(0xcf).ok(), Some(Vector::Rst08));
    assert!(Vector::try_from(0x00).is_err());
  }

  #[test]
  fn api_name_round_trip() {
    assert_eq!(ErApi::FadeIn.code(), 0x00);
    assert_eq!(ErApi::try_from(0x00).ok(), Some(ErApi::FadeIn));
    assert_eq!(format!("{}", ErApi::FadeIn), "ER_API_FadeIn");
  }

  #[test]
  fn default_catalog_knows_fade_in() {
    let catalog = ApiCatalog::default();
    let name = catalog.lookup(Vector::Rst00, 0x00);
    assert_eq!(name.map(|atom| atom.as_ref()), Some("ER_API_FadeIn"));
    assert!(catalog.lookup(Vector::Rst00, 0xff).is_none());
    assert!(catalog.lookup(Vector::Rst08, 0x00).is_none());
  }

  #[test]
  fn definitions_are_sorted_by_code() {
    let mut catalog = ApiCatalog::new();
    catalog.insert(Vector::Rst00, 0x02, "ER_API_Later");
    catalog.insert(Vector::Rst08, 0x01, "ER_API_Middle");
    catalog.insert(Vector::Rst00, 0x00, "ER_API_First");
    assert_eq!(
      catalog.definitions(),
      [
        "    ER_API_First = 0x00",
        "    ER_API_Middle = 0x01",
        "    ER_API_Later = 0x02",
      ].join("\n")
    );
  }

  #[test]
  fn default_definitions_unit() {
    assert_eq!(ApiCatalog::default().definitions(), "    ER_API_FadeIn = 0x00");
  }
}
