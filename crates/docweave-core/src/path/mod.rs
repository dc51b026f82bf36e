//! Field-path resolution.
//!
//! Turns a member path (typed `FieldRef` handles or a dotted name) into an
//! ordered list of path elements, each carrying its storage name and host
//! kind. Embedded documents are walked one segment at a time.


use crate::{
    db::ir::ConfigError,
    model::{DocumentModel, FieldKind, FieldModel},
    traits::Document,
};
use serde::{Serialize, Serializer};
use std::{fmt, marker::PhantomData};

///
/// FieldRef
///
/// Typed handle to one field of document `D`.
/// Handles are emitted by `document!`, so a reference to a field that does
/// not exist fails to compile.
///

pub struct FieldRef<D> {
    name: &'static str,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Clone for FieldRef<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for FieldRef<D> {}

impl<D> fmt::Debug for FieldRef<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldRef").field(&self.name).finish()
    }
}

impl<D: Document> FieldRef<D> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }

    /// Extend into an embedded document field.
    #[must_use]
    pub fn then<E: Document>(self, next: FieldRef<E>) -> FieldChain<D> {
        FieldChain {
            segments: vec![self.name, next.name],
            _marker: PhantomData,
        }
    }

    /// Resolve against the handle's own document.
    pub fn path(self) -> Result<FieldPath, ConfigError> {
        FieldPath::resolve(D::MODEL, self.name)
    }
}

///
/// FieldChain
/// Typed multi-segment path rooted at document `D`.
///

pub struct FieldChain<D> {
    segments: Vec<&'static str>,
    _marker: PhantomData<fn() -> D>,
}

impl<D: Document> FieldChain<D> {
    #[must_use]
    pub fn then<E: Document>(mut self, next: FieldRef<E>) -> Self {
        self.segments.push(next.name);
        self
    }
}

impl<D> Clone for FieldChain<D> {
    fn clone(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            _marker: PhantomData,
        }
    }
}

impl<D> fmt::Debug for FieldChain<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldChain").field(&self.segments).finish()
    }
}

///
/// FieldSelector
///
/// Unresolved field reference as accepted by builder and tree APIs.
/// Typed selectors remember the document they were declared on.
///

#[derive(Clone, Debug)]
pub enum FieldSelector {
    Named(String),
    Typed {
        owner: &'static DocumentModel,
        segments: Vec<&'static str>,
    },
}

impl FieldSelector {
    /// Document a typed selector belongs to.
    #[must_use]
    pub const fn owner(&self) -> Option<&'static DocumentModel> {
        match self {
            Self::Named(_) => None,
            Self::Typed { owner, .. } => Some(*owner),
        }
    }

    /// Dotted display name, used in diagnostics.
    #[must_use]
    pub fn dotted(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::Typed { segments, .. } => segments.join("."),
        }
    }

    /// Resolve against `model`; typed selectors must belong to it.
    pub fn resolve(&self, model: &'static DocumentModel) -> Result<FieldPath, ConfigError> {
        match self {
            Self::Named(name) => FieldPath::resolve(model, name),
            Self::Typed { owner, segments } => {
                if !owner.same_document(model) {
                    return Err(ConfigError::ForeignField {
                        document: model.path.to_string(),
                        field: segments.join("."),
                        owner: owner.path.to_string(),
                    });
                }

                FieldPath::resolve_segments(model, segments.iter().copied())
            }
        }
    }
}

///
/// IntoFieldSelector
///

pub trait IntoFieldSelector {
    fn into_selector(self) -> FieldSelector;
}

impl IntoFieldSelector for FieldSelector {
    fn into_selector(self) -> FieldSelector {
        self
    }
}

impl IntoFieldSelector for &str {
    fn into_selector(self) -> FieldSelector {
        FieldSelector::Named(self.to_string())
    }
}

impl IntoFieldSelector for String {
    fn into_selector(self) -> FieldSelector {
        FieldSelector::Named(self)
    }
}

impl<D: Document> IntoFieldSelector for FieldRef<D> {
    fn into_selector(self) -> FieldSelector {
        FieldSelector::Typed {
            owner: D::MODEL,
            segments: vec![self.name],
        }
    }
}

impl<D: Document> IntoFieldSelector for FieldChain<D> {
    fn into_selector(self) -> FieldSelector {
        FieldSelector::Typed {
            owner: D::MODEL,
            segments: self.segments,
        }
    }
}

///
/// PathElement
/// One resolved segment of a field path.
///

#[derive(Clone, Copy, Debug)]
pub struct PathElement {
    pub owner: &'static DocumentModel,
    pub field: &'static FieldModel,
}

impl PathElement {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.field.name
    }

    #[must_use]
    pub const fn storage_name(&self) -> &'static str {
        self.field.storage_name
    }

    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.field.kind
    }
}

///
/// FieldPath
///
/// Ordered, non-empty list of resolved path elements rooted at one document.
///

#[derive(Clone, Debug)]
pub struct FieldPath {
    root: &'static DocumentModel,
    elements: Vec<PathElement>,
}

impl FieldPath {
    /// Resolve a dotted path (`"Customer.Name"`) against `model`.
    pub fn resolve(model: &'static DocumentModel, dotted: &str) -> Result<Self, ConfigError> {
        Self::resolve_segments(model, dotted.split('.'))
    }

    fn resolve_segments<'a>(
        model: &'static DocumentModel,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ConfigError> {
        let mut elements = Vec::new();
        let mut current = model;
        let mut walked = String::new();

        for segment in segments {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(segment);

            // a previous element must have opened an embedded document
            if let Some(last) = elements.last().map(|element: &PathElement| element.kind()) {
                let FieldKind::Embedded(inner) = last else {
                    return Err(ConfigError::unknown_field(model, &walked));
                };
                current = inner;
            }

            let field = current
                .field(segment)
                .ok_or_else(|| ConfigError::unknown_field(model, &walked))?;

            elements.push(PathElement {
                owner: current,
                field,
            });
        }

        if elements.is_empty() {
            return Err(ConfigError::unknown_field(model, ""));
        }

        Ok(Self {
            root: model,
            elements,
        })
    }

    #[must_use]
    pub const fn root(&self) -> &'static DocumentModel {
        self.root
    }

    #[must_use]
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Last element's field descriptor.
    #[must_use]
    pub fn leaf(&self) -> &'static FieldModel {
        // non-empty by construction
        self.elements[self.elements.len() - 1].field
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.leaf().kind
    }

    /// A path is nullable when any element along it is.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.elements.iter().any(|element| element.field.nullable)
    }

    /// Every element reaches storage.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        self.elements.iter().all(|element| element.field.is_stored())
    }

    #[must_use]
    pub fn dotted(&self) -> String {
        self.elements
            .iter()
            .map(PathElement::name)
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn storage_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.elements.iter().map(PathElement::storage_name)
    }
}

impl PartialEq for FieldPath {
    fn eq(&self, other: &Self) -> bool {
        self.root.same_document(other.root)
            && self.elements.len() == other.elements.len()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(left, right)| left.name() == right.name())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted())
    }
}

// Serialized as the dotted member path; models are static and not data.
impl Serialize for FieldPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
