//! # Aspects
//!
//! An aspect is a predicate over an entity's component set, built from three
//! groups of component ids:
//!
//! - **All**: every one must be present
//! - **Some**: at least one must be present (ignored when empty)
//! - **None**: none may be present
//!
//! Matching is a pure function of two bitsets and costs O(words), not
//! O(types checked individually).
//!
//! ## Example
//!
//! ```rust,ignore
//! let aspect = Aspect::builder(&mut registry)
//!     .all::<(Position, Velocity)>()
//!     .none::<Frozen>()
//!     .read_only::<Velocity>()
//!     .build();
//! ```

use super::component::{Component, ComponentId, ComponentRegistry};
use super::flags::{words_intersect, words_superset, ComponentFlags, ComponentFlagsBuilder};

/// Immutable entity predicate plus access hints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Aspect {
    all: ComponentFlags,
    some: ComponentFlags,
    none: ComponentFlags,
    read_only: ComponentFlags,
    externally_managed: bool,
}

impl Aspect {
    /// Starts building an aspect, resolving types through `registry`.
    pub fn builder(registry: &mut ComponentRegistry) -> AspectBuilder<'_> {
        AspectBuilder::new(registry)
    }

    /// Components that must all be present.
    #[inline]
    #[must_use]
    pub fn all(&self) -> &ComponentFlags {
        &self.all
    }

    /// Components of which at least one must be present.
    #[inline]
    #[must_use]
    pub fn some(&self) -> &ComponentFlags {
        &self.some
    }

    /// Components that must be absent.
    #[inline]
    #[must_use]
    pub fn none(&self) -> &ComponentFlags {
        &self.none
    }

    /// Components the owner only reads.
    #[inline]
    #[must_use]
    pub fn read_only(&self) -> &ComponentFlags {
        &self.read_only
    }

    /// Whether membership is maintained by the owner instead of the world.
    #[inline]
    #[must_use]
    pub fn is_externally_managed(&self) -> bool {
        self.externally_managed
    }

    /// Tests an entity's flags against this aspect.
    #[inline]
    #[must_use]
    pub fn matches(&self, flags: &ComponentFlags) -> bool {
        self.matches_words(flags.words())
    }

    /// Tests raw flag words against this aspect.
    ///
    /// `words` may carry trailing zero words.
    #[inline]
    #[must_use]
    pub fn matches_words(&self, words: &[u64]) -> bool {
        words_superset(words, self.all.words())
            && (self.some.is_empty() || words_intersect(words, self.some.words()))
            && !words_intersect(words, self.none.words())
    }

    /// Returns `true` if `id` appears in any of the three groups.
    ///
    /// Adding or removing a component the aspect does not mention can never
    /// change whether an entity matches.
    #[inline]
    #[must_use]
    pub fn mentions(&self, id: ComponentId) -> bool {
        self.all.contains(id) || self.some.contains(id) || self.none.contains(id)
    }

    /// Ids whose data the owner touches (All and Some).
    fn accessed(&self) -> ComponentFlags {
        let mut builder = ComponentFlagsBuilder::from_flags(&self.all);
        for id in &self.some {
            builder.enable(id);
        }
        builder.build()
    }

    /// Accessed ids not marked read-only.
    fn written(&self) -> ComponentFlags {
        let mut builder = ComponentFlagsBuilder::from_flags(&self.accessed());
        for id in &self.read_only {
            builder.disable(id);
        }
        builder.build()
    }

    /// Returns `true` if the owners of the two aspects could not safely run
    /// concurrently: one writes a component the other accesses.
    #[must_use]
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.written().intersects(&other.accessed()) || other.written().intersects(&self.accessed())
    }
}

/// A component type or tuple of component types usable in aspect groups.
pub trait ComponentSet {
    /// Resolves every member type through `registry`, in declaration order.
    fn for_each_id(registry: &mut ComponentRegistry, f: &mut dyn FnMut(ComponentId));
}

impl<T: Component> ComponentSet for T {
    fn for_each_id(registry: &mut ComponentRegistry, f: &mut dyn FnMut(ComponentId)) {
        f(registry.id_of::<T>());
    }
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: ComponentSet),+> ComponentSet for ($($name,)+) {
            fn for_each_id(registry: &mut ComponentRegistry, f: &mut dyn FnMut(ComponentId)) {
                $($name::for_each_id(registry, f);)+
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

/// Builder for [`Aspect`].
///
/// Types are resolved to ids as they are added, registering them on first
/// use.
pub struct AspectBuilder<'r> {
    registry: &'r mut ComponentRegistry,
    all: ComponentFlagsBuilder,
    some: ComponentFlagsBuilder,
    none: ComponentFlagsBuilder,
    read_only: ComponentFlagsBuilder,
    externally_managed: bool,
}

impl<'r> AspectBuilder<'r> {
    /// Creates an empty builder. An empty aspect matches every entity.
    pub fn new(registry: &'r mut ComponentRegistry) -> Self {
        Self {
            registry,
            all: ComponentFlagsBuilder::new(),
            some: ComponentFlagsBuilder::new(),
            none: ComponentFlagsBuilder::new(),
            read_only: ComponentFlagsBuilder::new(),
            externally_managed: false,
        }
    }

    fn set<S: ComponentSet>(
        registry: &mut ComponentRegistry,
        target: &mut ComponentFlagsBuilder,
    ) {
        S::for_each_id(registry, &mut |id| {
            target.enable(id);
        });
    }

    /// Requires every type in `S`.
    #[must_use]
    pub fn all<S: ComponentSet>(mut self) -> Self {
        Self::set::<S>(self.registry, &mut self.all);
        self
    }

    /// Requires at least one type out of every `some` type added.
    #[must_use]
    pub fn some<S: ComponentSet>(mut self) -> Self {
        Self::set::<S>(self.registry, &mut self.some);
        self
    }

    /// Excludes every type in `S`.
    #[must_use]
    pub fn none<S: ComponentSet>(mut self) -> Self {
        Self::set::<S>(self.registry, &mut self.none);
        self
    }

    /// Marks the types in `S` as only read. Does not affect matching.
    #[must_use]
    pub fn read_only<S: ComponentSet>(mut self) -> Self {
        Self::set::<S>(self.registry, &mut self.read_only);
        self
    }

    /// Hands membership maintenance to the owner of the aspect.
    #[must_use]
    pub fn externally_managed(mut self) -> Self {
        self.externally_managed = true;
        self
    }

    /// Finishes the aspect.
    #[must_use]
    pub fn build(self) -> Aspect {
        Aspect {
            all: self.all.build(),
            some: self.some.build(),
            none: self.none.build(),
            read_only: self.read_only.build(),
            externally_managed: self.externally_managed,
        }
    }
}
