//! Built-in components shared by most scenes.

use std::fmt;

use super::component::Component;

// =============================================================================
// Name
// =============================================================================

/// Human-readable entity name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Name(String);

impl Name {
    /// Creates a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Replaces the name.
    pub fn set(&mut self, name: impl Into<String>) {
        self.0 = name.into();
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Component for Name {
    fn reset(&mut self) {
        // Keep the allocation for the next user.
        self.0.clear();
    }
}

// =============================================================================
// Tag
// =============================================================================

/// A primary tag plus any number of additional tags.
///
/// Empty tags are ignored; a tag is never stored twice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    primary: String,
    extra: Vec<String>,
}

impl Tag {
    /// Creates a tag set with a primary tag.
    #[must_use]
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            extra: Vec::new(),
        }
    }

    /// The primary tag (empty if unset).
    #[must_use]
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Replaces the primary tag.
    pub fn set_primary(&mut self, tag: impl Into<String>) {
        self.primary = tag.into();
    }

    /// Adds an additional tag unless it is empty or already present.
    pub fn add(&mut self, tag: &str) {
        if !tag.is_empty() && !self.has(tag) {
            self.extra.push(tag.to_owned());
        }
    }

    /// Removes `tag`, clearing the primary tag if it matches.
    pub fn remove(&mut self, tag: &str) -> bool {
        if !tag.is_empty() && self.primary == tag {
            self.primary.clear();
            return true;
        }
        match self.extra.iter().position(|t| t == tag) {
            Some(pos) => {
                self.extra.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Whether `tag` is the primary or an additional tag.
    #[must_use]
    pub fn has(&self, tag: &str) -> bool {
        (!tag.is_empty() && self.primary == tag) || self.extra.iter().any(|t| t == tag)
    }

    /// Every tag, primary first.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str())
            .filter(|p| !p.is_empty())
            .chain(self.extra.iter().map(String::as_str))
    }
}

impl Component for Tag {
    fn reset(&mut self) {
        self.primary.clear();
        self.extra.clear();
    }
}

// =============================================================================
// Active
// =============================================================================

/// Whether the entity takes part in gameplay logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Active(pub bool);

impl Default for Active {
    fn default() -> Self {
        Self(true)
    }
}

impl Active {
    /// Flips the flag and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.0 = !self.0;
        self.0
    }
}

impl Component for Active {}

// =============================================================================
// Visible
// =============================================================================

/// Visibility and draw ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visible {
    /// Whether the entity is drawn.
    pub visible: bool,
    /// Coarse draw layer.
    pub layer: i32,
    /// Order within the layer.
    pub order: i32,
}

impl Default for Visible {
    fn default() -> Self {
        Self {
            visible: true,
            layer: 0,
            order: 0,
        }
    }
}

impl Visible {
    /// Creates a visible entry on `layer` with `order`.
    #[must_use]
    pub const fn on_layer(layer: i32, order: i32) -> Self {
        Self {
            visible: true,
            layer,
            order,
        }
    }

    /// Packed sort key: the layer in the high bits, the low 16 bits of the
    /// order below it.
    #[must_use]
    pub const fn sort_key(&self) -> i32 {
        (self.layer << 16) | (self.order & 0xFFFF)
    }
}

impl Component for Visible {}

// =============================================================================
// Lifetime
// =============================================================================

/// Limited lifespan in seconds. A maximum of zero or less is immortal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Lifetime {
    max: f32,
    age: f32,
    expired: bool,
}

impl Lifetime {
    /// Creates a lifetime of `max` seconds.
    #[must_use]
    pub const fn new(max: f32) -> Self {
        Self {
            max,
            age: 0.0,
            expired: false,
        }
    }

    /// Creates a lifetime that never expires.
    #[must_use]
    pub const fn immortal() -> Self {
        Self::new(0.0)
    }

    /// Advances the age by `dt`. Returns `true` once the lifetime is used up.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.is_immortal() {
            return false;
        }
        self.age += dt;
        if self.age >= self.max {
            self.expired = true;
        }
        self.expired
    }

    /// Seconds left, zero for immortal or expired entries.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        if self.is_immortal() {
            return 0.0;
        }
        (self.max - self.age).max(0.0)
    }

    /// Fraction of the lifetime used, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.is_immortal() {
            return 0.0;
        }
        (self.age / self.max).min(1.0)
    }

    /// Seconds lived so far.
    #[must_use]
    pub const fn age(&self) -> f32 {
        self.age
    }

    /// Maximum lifetime in seconds.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Changes the maximum lifetime.
    pub fn set_max(&mut self, max: f32) {
        self.max = max;
    }

    /// Whether the entity should be destroyed.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.expired
    }

    /// Forces expiry regardless of age.
    pub fn expire(&mut self) {
        self.expired = true;
    }

    /// Whether the lifetime never runs out.
    #[must_use]
    pub fn is_immortal(&self) -> bool {
        self.max <= 0.0
    }
}

impl Component for Lifetime {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_reset() {
        let mut name = Name::new("player");
        assert_eq!(name.to_string(), "player");
        name.reset();
        assert_eq!(name.as_str(), "");
    }

    #[test]
    fn test_tag_set_semantics() {
        let mut tag = Tag::new("enemy");
        tag.add("flying");
        tag.add("flying");
        tag.add("enemy");
        tag.add("");
        assert_eq!(tag.all().collect::<Vec<_>>(), vec!["enemy", "flying"]);

        assert!(tag.has("flying"));
        assert!(tag.remove("enemy"));
        assert!(!tag.has("enemy"));
        assert_eq!(tag.primary(), "");
        assert!(!tag.remove("missing"));
        assert_eq!(tag.all().collect::<Vec<_>>(), vec!["flying"]);
    }

    #[test]
    fn test_active_toggle_and_reset() {
        let mut active = Active(false);
        assert!(active.toggle());
        assert!(!active.toggle());
        active.reset();
        assert_eq!(active, Active(true));
    }

    #[test]
    fn test_visible_sort_key() {
        let v = Visible::on_layer(2, 5);
        assert_eq!(v.sort_key(), (2 << 16) | 5);
        assert!(Visible::on_layer(1, 9000).sort_key() < Visible::on_layer(2, 0).sort_key());

        let mut hidden = Visible {
            visible: false,
            layer: 3,
            order: 1,
        };
        hidden.reset();
        assert_eq!(hidden, Visible::default());
    }

    #[test]
    fn test_lifetime_expiry() {
        let mut life = Lifetime::new(5.0);
        assert!(!life.tick(3.0));
        assert!((life.remaining() - 2.0).abs() < f32::EPSILON);
        assert!((life.progress() - 0.6).abs() < 1e-6);
        assert!(life.tick(3.0));
        assert_eq!(life.remaining(), 0.0);
        assert_eq!(life.progress(), 1.0);
    }

    #[test]
    fn test_lifetime_immortal() {
        let mut life = Lifetime::immortal();
        assert!(life.is_immortal());
        assert!(!life.tick(1_000.0));
        assert_eq!(life.age(), 0.0);
        assert_eq!(life.remaining(), 0.0);
        assert_eq!(life.progress(), 0.0);
    }
}
