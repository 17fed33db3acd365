use core::any::TypeId;
use core::fmt;

use super::Described;
use crate::bind::Bindable;
use crate::decl::{Section, SectionSpec};
use crate::error::BindResult;

// -----------------------------------------------------------------------------
// TypeDesc

/// A self-contained description of a type, including its generic arguments.
///
/// Descriptors travel by value through the engine; two descriptors are
/// equal when they describe the same type with the same arguments. The
/// [`DescKind`] tag classifies the type for dispatch and carries small
/// function tables where the engine must construct or inspect values of
/// the described type without knowing it statically.
///
/// # Examples
///
/// ```
/// use docbind_core::TypeDesc;
///
/// let desc = TypeDesc::of::<Vec<i64>>();
/// assert!(desc.is_list());
/// assert_eq!(desc.sub_type(0).map(TypeDesc::name), Some("i64"));
/// assert_eq!(desc.sub_type(1), None);
/// ```
#[derive(Clone)]
pub struct TypeDesc {
    id: TypeId,
    name: &'static str,
    kind: DescKind,
    args: Vec<TypeDesc>,
}

impl TypeDesc {
    /// Shorthand for `T::desc()`.
    #[inline]
    pub fn of<T: Described>() -> Self {
        T::desc()
    }

    /// Describes `T` with an explicit kind and no generic arguments.
    pub fn new<T: 'static>(name: &'static str, kind: DescKind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
            kind,
            args: Vec::new(),
        }
    }

    /// Attaches generic arguments to this descriptor.
    pub fn with_args(mut self, args: impl IntoIterator<Item = TypeDesc>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Describes a scalar type.
    pub fn scalar<T: 'static>(name: &'static str, kind: ScalarKind) -> Self {
        Self::new::<T>(name, DescKind::Scalar(kind))
    }

    /// Describes a type the engine treats as a black box.
    pub fn opaque<T: 'static>(name: &'static str) -> Self {
        Self::new::<T>(name, DescKind::Opaque)
    }

    /// Describes an enumeration.
    pub fn enumeration<T: 'static>(name: &'static str, meta: EnumMeta) -> Self {
        Self::new::<T>(name, DescKind::Enum(meta))
    }

    /// Describes a list with a known item type.
    pub fn list<T: 'static>(name: &'static str, meta: ListMeta, item: TypeDesc) -> Self {
        Self::new::<T>(name, DescKind::List(meta)).with_args([item])
    }

    /// Describes a map with known key and value types.
    pub fn map<T: 'static>(name: &'static str, meta: MapMeta, key: TypeDesc, value: TypeDesc) -> Self {
        Self::new::<T>(name, DescKind::Map(meta)).with_args([key, value])
    }

    /// Describes an optional wrapper around `inner`.
    pub fn optional<T: 'static>(name: &'static str, meta: OptionalMeta, inner: TypeDesc) -> Self {
        Self::new::<T>(name, DescKind::Optional(meta)).with_args([inner])
    }

    /// Describes a section type backed by its declaration.
    pub fn section<T: Section>(name: &'static str) -> Self {
        fn instance_of<T: Section>() -> Box<dyn Bindable> {
            Box::new(T::default())
        }
        Self::new::<T>(
            name,
            DescKind::Section(SectionMeta {
                spec: T::spec,
                instance: instance_of::<T>,
            }),
        )
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn kind(&self) -> &DescKind {
        &self.kind
    }

    #[inline]
    pub fn args(&self) -> &[TypeDesc] {
        &self.args
    }

    /// The generic argument at `index`, if the descriptor carries one.
    #[inline]
    pub fn sub_type(&self, index: usize) -> Option<&TypeDesc> {
        self.args.get(index)
    }

    /// Whether this descriptor describes exactly `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    pub const fn is_scalar(&self) -> bool {
        matches!(self.kind, DescKind::Scalar(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self.kind, DescKind::Scalar(ScalarKind::Str))
    }

    pub const fn is_enum(&self) -> bool {
        matches!(self.kind, DescKind::Enum(_))
    }

    pub const fn is_list(&self) -> bool {
        matches!(self.kind, DescKind::List(_))
    }

    pub const fn is_map(&self) -> bool {
        matches!(self.kind, DescKind::Map(_))
    }

    pub const fn is_optional(&self) -> bool {
        matches!(self.kind, DescKind::Optional(_))
    }

    pub const fn is_section(&self) -> bool {
        matches!(self.kind, DescKind::Section(_))
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.args == other.args
    }
}

impl Eq for TypeDesc {}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDesc")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// DescKind

/// Classification of a described type.
///
/// The engine dispatches on this tag in a single place per direction,
/// instead of probing capabilities one after another.
#[derive(Clone, Copy)]
pub enum DescKind {
    /// A primitive value with a native document representation.
    Scalar(ScalarKind),
    /// A closed set of named values.
    Enum(EnumMeta),
    /// A sequence with one generic item type.
    List(ListMeta),
    /// A key-value collection with two generic argument types.
    Map(MapMeta),
    /// An optional wrapper; `None` maps to an absent document value.
    Optional(OptionalMeta),
    /// A typed object with its own field declarations.
    Section(SectionMeta),
    /// Anything else. Only transformers can convert opaque types.
    Opaque,
}

impl DescKind {
    pub const fn tag_name(&self) -> &'static str {
        match self {
            DescKind::Scalar(_) => "scalar",
            DescKind::Enum(_) => "enum",
            DescKind::List(_) => "list",
            DescKind::Map(_) => "map",
            DescKind::Optional(_) => "optional",
            DescKind::Section(_) => "section",
            DescKind::Opaque => "opaque",
        }
    }
}

impl fmt::Debug for DescKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescKind::Scalar(kind) => write!(f, "Scalar({kind:?})"),
            other => f.write_str(other.tag_name()),
        }
    }
}

// -----------------------------------------------------------------------------
// ScalarKind

/// The native scalars a document can hold directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
}

impl ScalarKind {
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            ScalarKind::I8
                | ScalarKind::I16
                | ScalarKind::I32
                | ScalarKind::I64
                | ScalarKind::U8
                | ScalarKind::U16
                | ScalarKind::U32
                | ScalarKind::U64
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }
}

// -----------------------------------------------------------------------------
// Kind metadata

/// Lookup table for an enumeration.
#[derive(Clone, Copy)]
pub struct EnumMeta {
    /// Every legal name, in declaration order.
    pub variants: &'static [&'static str],
    /// Resolves an exact name to a value.
    pub from_name: fn(&str) -> Option<Box<dyn Bindable>>,
    /// Names a value of the described enum.
    pub name_of: fn(&dyn Bindable) -> Option<&'static str>,
}

/// Construction table for a list type.
#[derive(Clone, Copy)]
pub struct ListMeta {
    /// Builds the concrete list from already-resolved items.
    pub from_items: fn(Vec<Box<dyn Bindable>>) -> BindResult<Box<dyn Bindable>>,
}

/// Construction table for a map type.
#[derive(Clone, Copy)]
pub struct MapMeta {
    /// Builds the concrete map from already-resolved pairs.
    pub from_pairs: fn(Vec<(Box<dyn Bindable>, Box<dyn Bindable>)>) -> BindResult<Box<dyn Bindable>>,
}

/// Construction table for an optional wrapper.
#[derive(Clone, Copy)]
pub struct OptionalMeta {
    pub none: fn() -> Box<dyn Bindable>,
    pub some: fn(Box<dyn Bindable>) -> BindResult<Box<dyn Bindable>>,
}

/// Hooks into the declaration model for a section type.
#[derive(Clone, Copy)]
pub struct SectionMeta {
    /// Produces the field specification the declaration is built from.
    pub spec: fn() -> SectionSpec,
    /// Produces a default-initialized instance.
    pub instance: fn() -> Box<dyn Bindable>,
}

// -----------------------------------------------------------------------------
// Tests
