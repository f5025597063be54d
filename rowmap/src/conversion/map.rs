use std::collections::HashMap;

use super::TypeConversion;
use crate::types::{normalize, TypeKey};

/// One node of the type-descriptor graph: the conversions registered for a
/// source type together with its declared supertype and interfaces.
#[derive(Default)]
struct TypeNode {
    conversions: Vec<TypeConversion>,
    supertype: Option<TypeKey>,
    interfaces: Vec<TypeKey>,
}

/// Index from a normalized source type to its conversions, supporting
/// polymorphic lookup over the declared supertype chain and interfaces.
///
/// Built once at configuration time, read-only afterwards.
#[derive(Default)]
pub(crate) struct ConversionMap {
    nodes: HashMap<TypeKey, TypeNode>,
}

impl ConversionMap {
    pub(crate) fn register(&mut self, conversion: TypeConversion) {
        let source = normalize(conversion.source());
        tracing::trace!(
            source = source.name(),
            target = conversion.target().name(),
            "registering conversion"
        );
        self.nodes.entry(source).or_default().conversions.push(conversion);
    }

    pub(crate) fn declare_supertype(&mut self, subtype: TypeKey, supertype: TypeKey) {
        self.nodes.entry(normalize(subtype)).or_default().supertype = Some(normalize(supertype));
    }

    pub(crate) fn declare_interface(&mut self, ty: TypeKey, interface: TypeKey) {
        let node = self.nodes.entry(normalize(ty)).or_default();
        if !node.interfaces.contains(&interface) {
            node.interfaces.push(interface);
        }
    }

    /// Find a conversion accepting `source` values and producing values
    /// usable where `target` is requested.
    ///
    /// The supertype chain is walked first, from `source` up to the root.
    /// The first non-empty bucket on the chain ends the search, whether or
    /// not it holds a target-compatible conversion. Interfaces are consulted
    /// only when the entire chain had no bucket at all.
    pub(crate) fn find_conversion(
        &self,
        source: TypeKey,
        target: TypeKey,
    ) -> Option<&TypeConversion> {
        let source = normalize(source);
        let target = normalize(target);

        let mut current = Some(source);
        while let Some(key) = current {
            if let Some(node) = self.nodes.get(&key) {
                if !node.conversions.is_empty() {
                    return self.scan_bucket(&node.conversions, target);
                }
            }
            current = self.supertype_of(key);
        }

        for interface in self.interfaces_of(source) {
            if let Some(node) = self.nodes.get(&interface) {
                if let Some(found) = self.scan_bucket(&node.conversions, target) {
                    return Some(found);
                }
            }
        }

        None
    }

    /// Scan a bucket most-recently-registered first; entries with an
    /// incompatible target are skipped, not treated as errors.
    fn scan_bucket<'a>(
        &self,
        bucket: &'a [TypeConversion],
        target: TypeKey,
    ) -> Option<&'a TypeConversion> {
        bucket
            .iter()
            .rev()
            .find(|conversion| self.is_assignable(target, conversion.target()))
    }

    /// Whether a value of type `declared` satisfies a request for `requested`.
    fn is_assignable(&self, requested: TypeKey, declared: TypeKey) -> bool {
        let requested = normalize(requested);
        let declared = normalize(declared);
        if requested == declared || requested.is_root() {
            return true;
        }

        let mut queue = vec![declared];
        let mut seen = vec![declared];
        while let Some(key) = queue.pop() {
            let mut neighbors: Vec<TypeKey> = Vec::new();
            if let Some(supertype) = self.supertype_of(key) {
                neighbors.push(supertype);
            }
            if let Some(node) = self.nodes.get(&key) {
                neighbors.extend(node.interfaces.iter().copied());
            }
            for next in neighbors {
                if next == requested {
                    return true;
                }
                if !seen.contains(&next) {
                    seen.push(next);
                    queue.push(next);
                }
            }
        }
        false
    }

    /// The declared supertype, defaulting to the universal root.
    fn supertype_of(&self, key: TypeKey) -> Option<TypeKey> {
        if key.is_root() {
            return None;
        }
        match self.nodes.get(&key).and_then(|node| node.supertype) {
            Some(supertype) => Some(supertype),
            None => Some(TypeKey::root()),
        }
    }

    /// Every interface implemented anywhere on `source`'s supertype chain,
    /// in declaration order, followed by their super-interfaces.
    fn interfaces_of(&self, source: TypeKey) -> Vec<TypeKey> {
        let mut result: Vec<TypeKey> = Vec::new();

        let mut current = Some(source);
        while let Some(key) = current {
            if let Some(node) = self.nodes.get(&key) {
                for interface in &node.interfaces {
                    if !result.contains(interface) {
                        result.push(*interface);
                    }
                }
            }
            current = self.supertype_of(key);
        }

        let mut index = 0;
        while index < result.len() {
            if let Some(node) = self.nodes.get(&result[index]) {
                for interface in node.interfaces.clone() {
                    if !result.contains(&interface) {
                        result.push(interface);
                    }
                }
            }
            index += 1;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::AnyValue;

    struct Animal;
    struct Dog;
    trait Pet {}

    fn animal() -> TypeKey {
        TypeKey::of::<Animal>()
    }

    fn dog() -> TypeKey {
        TypeKey::of::<Dog>()
    }

    fn pet() -> TypeKey {
        TypeKey::of::<dyn Pet>()
    }

    fn tagged(source: TypeKey, target: TypeKey, tag: &'static str) -> TypeConversion {
        TypeConversion::erased(source, target, move |_| Ok(Box::new(tag) as AnyValue))
    }

    fn tag_of(conversion: &TypeConversion) -> &'static str {
        *conversion
            .apply(&())
            .unwrap()
            .downcast::<&'static str>()
            .unwrap()
    }

    #[test]
    fn latest_registration_shadows_earlier() {
        let mut map = ConversionMap::default();
        map.register(TypeConversion::new(|value: &i64| format!("a:{value}")));
        map.register(TypeConversion::new(|value: &i64| format!("b:{value}")));

        let conversion = map
            .find_conversion(TypeKey::of::<i64>(), TypeKey::of::<String>())
            .unwrap();
        let out = conversion.apply(&7i64).unwrap();
        assert_eq!(*out.downcast::<String>().unwrap(), "b:7");
    }

    #[test]
    fn conversion_for_supertype_applies_to_subtype() {
        let mut map = ConversionMap::default();
        map.declare_supertype(dog(), animal());
        map.register(tagged(animal(), TypeKey::of::<String>(), "from-animal"));

        let found = map.find_conversion(dog(), TypeKey::of::<String>()).unwrap();
        assert_eq!(tag_of(found), "from-animal");
    }

    #[test]
    fn registration_for_exact_type_wins_over_supertype() {
        let mut map = ConversionMap::default();
        map.declare_supertype(dog(), animal());
        map.register(tagged(animal(), TypeKey::of::<String>(), "from-animal"));
        map.register(tagged(dog(), TypeKey::of::<String>(), "from-dog"));

        let found = map.find_conversion(dog(), TypeKey::of::<String>()).unwrap();
        assert_eq!(tag_of(found), "from-dog");
    }

    #[test]
    fn non_matching_bucket_on_chain_blocks_interface_search() {
        let mut map = ConversionMap::default();
        map.declare_supertype(dog(), animal());
        map.declare_interface(dog(), pet());
        // The closer class has a bucket, but it only produces i64.
        map.register(tagged(animal(), TypeKey::of::<i64>(), "animal-to-int"));
        // A farther interface could produce the requested String.
        map.register(tagged(pet(), TypeKey::of::<String>(), "pet-to-string"));

        assert!(map.find_conversion(dog(), TypeKey::of::<String>()).is_none());
    }

    #[test]
    fn interfaces_are_searched_after_chain_is_exhausted() {
        let mut map = ConversionMap::default();
        map.declare_supertype(dog(), animal());
        map.declare_interface(dog(), pet());
        map.register(tagged(pet(), TypeKey::of::<String>(), "pet-to-string"));

        let found = map.find_conversion(dog(), TypeKey::of::<String>()).unwrap();
        assert_eq!(tag_of(found), "pet-to-string");
    }

    #[test]
    fn interface_of_supertype_is_visible() {
        let mut map = ConversionMap::default();
        map.declare_supertype(dog(), animal());
        map.declare_interface(animal(), pet());
        map.register(tagged(pet(), TypeKey::of::<String>(), "pet-to-string"));

        assert!(map.find_conversion(dog(), TypeKey::of::<String>()).is_some());
    }

    #[test]
    fn borrowed_and_owned_text_share_a_bucket() {
        let mut map = ConversionMap::default();
        map.register(TypeConversion::new(|value: &String| value.len() as i64));

        assert!(map
            .find_conversion(TypeKey::of::<&str>(), TypeKey::of::<i64>())
            .is_some());
        assert!(map
            .find_conversion(TypeKey::of::<String>(), TypeKey::of::<i64>())
            .is_some());
    }

    #[test]
    fn unregistered_type_finds_nothing() {
        let map = ConversionMap::default();
        assert!(map
            .find_conversion(TypeKey::of::<u128>(), TypeKey::of::<String>())
            .is_none());
    }

    #[test]
    fn one_bucket_serves_multiple_target_hierarchies() {
        let mut map = ConversionMap::default();
        map.register(tagged(TypeKey::of::<String>(), TypeKey::of::<i64>(), "to-int"));
        map.register(tagged(
            TypeKey::of::<String>(),
            TypeKey::of::<serde_json::Value>(),
            "to-json",
        ));

        // The later registration is scanned first but skipped for an
        // incompatible target request.
        let found = map
            .find_conversion(TypeKey::of::<String>(), TypeKey::of::<i64>())
            .unwrap();
        assert_eq!(tag_of(found), "to-int");

        let found = map
            .find_conversion(TypeKey::of::<String>(), TypeKey::of::<serde_json::Value>())
            .unwrap();
        assert_eq!(tag_of(found), "to-json");
    }

    #[test]
    fn declared_target_satisfies_its_supertype() {
        let mut map = ConversionMap::default();
        map.declare_supertype(dog(), animal());
        map.register(tagged(TypeKey::of::<String>(), dog(), "to-dog"));

        // A conversion producing Dog satisfies a request for Animal.
        assert!(map.find_conversion(TypeKey::of::<String>(), animal()).is_some());
        // Any declared target satisfies a request for the root.
        assert!(map
            .find_conversion(TypeKey::of::<String>(), TypeKey::root())
            .is_some());
    }

    #[test]
    fn declared_target_satisfies_its_interface() {
        let mut map = ConversionMap::default();
        map.declare_interface(dog(), pet());
        map.register(tagged(TypeKey::of::<String>(), dog(), "to-dog"));

        assert!(map.find_conversion(TypeKey::of::<String>(), pet()).is_some());
    }
}
