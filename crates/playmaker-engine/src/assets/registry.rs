use std::collections::HashMap;

/// Index of an interned sprite source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteId(pub u32);

/// Interns sprite sources (image URLs) to stable indices.
///
/// Render instances carry the index; the host keeps a parallel list of
/// loaded images and skips any index whose image hasn't finished loading.
#[derive(Debug, Default)]
pub struct SpriteRegistry {
    ids: HashMap<String, SpriteId>,
    sources: Vec<String>,
}

impl SpriteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id for `source`, registering it on first sight.
    pub fn intern(&mut self, source: &str) -> SpriteId {
        if let Some(&id) = self.ids.get(source) {
            return id;
        }
        let id = SpriteId(self.sources.len() as u32);
        self.sources.push(source.to_string());
        self.ids.insert(source.to_string(), id);
        log::debug!("registered sprite {} as {}", source, id.0);
        id
    }

    /// Look up a registered source. Returns None if not found.
    pub fn get(&self, source: &str) -> Option<SpriteId> {
        self.ids.get(source).copied()
    }

    pub fn source(&self, id: SpriteId) -> Option<&str> {
        self.sources.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let mut reg = SpriteRegistry::new();
        let hero = reg.intern("hero.png");
        let wall = reg.intern("wall.png");
        assert_eq!(reg.intern("hero.png"), hero);
        assert_ne!(hero, wall);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.source(wall), Some("wall.png"));
    }

    #[test]
    fn unknown_returns_none() {
        let reg = SpriteRegistry::new();
        assert!(reg.get("nonexistent.png").is_none());
        assert!(reg.source(SpriteId(3)).is_none());
    }
}
