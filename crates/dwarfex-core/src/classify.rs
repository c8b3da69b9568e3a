//! # Type Classifier
//!
//! Maps a [`DebugEntry`] to the closed [`Kind`] vocabulary the rest of the
//! pipeline matches on. Classification is a pure function of the entry's tag
//! and, for base types, its `DW_AT_encoding`.
//!
//! Three vocabularies live here:
//!
//! - [`Kind`]: the internal variant every stage dispatches on
//! - [`ExportClass`]: the user-facing class names accepted by `--class`
//! - [`DataType`]: the `datatype` strings written to the JSON output

use std::fmt;
use std::str::FromStr;

use gimli::{constants, DwAte};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::entry::DebugEntry;

/// Scalar encoding of a base type, named as in the output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseEncoding
{
    Void,
    Address,
    Boolean,
    ComplexFloat,
    Float,
    Int,
    Char,
    Uint,
    Uchar,
    ImaginaryFloat,
    PackedDecimal,
    NumericalString,
    Edited,
    Fixed,
    Ufixed,
    DecimalFloat,
    Utf,
    Ucs,
    Ascii,
}

impl BaseEncoding
{
    pub const ALL: [BaseEncoding; 19] = [
        BaseEncoding::Void,
        BaseEncoding::Address,
        BaseEncoding::Boolean,
        BaseEncoding::ComplexFloat,
        BaseEncoding::Float,
        BaseEncoding::Int,
        BaseEncoding::Char,
        BaseEncoding::Uint,
        BaseEncoding::Uchar,
        BaseEncoding::ImaginaryFloat,
        BaseEncoding::PackedDecimal,
        BaseEncoding::NumericalString,
        BaseEncoding::Edited,
        BaseEncoding::Fixed,
        BaseEncoding::Ufixed,
        BaseEncoding::DecimalFloat,
        BaseEncoding::Utf,
        BaseEncoding::Ucs,
        BaseEncoding::Ascii,
    ];

    /// Map a `DW_ATE_*` code. Code 0 (no encoding) is `void`.
    pub fn from_dwarf(encoding: DwAte) -> Option<Self>
    {
        let encoding = match encoding {
            DwAte(0) => BaseEncoding::Void,
            constants::DW_ATE_address => BaseEncoding::Address,
            constants::DW_ATE_boolean => BaseEncoding::Boolean,
            constants::DW_ATE_complex_float => BaseEncoding::ComplexFloat,
            constants::DW_ATE_float => BaseEncoding::Float,
            constants::DW_ATE_signed => BaseEncoding::Int,
            constants::DW_ATE_signed_char => BaseEncoding::Char,
            constants::DW_ATE_unsigned => BaseEncoding::Uint,
            constants::DW_ATE_unsigned_char => BaseEncoding::Uchar,
            constants::DW_ATE_imaginary_float => BaseEncoding::ImaginaryFloat,
            constants::DW_ATE_packed_decimal => BaseEncoding::PackedDecimal,
            constants::DW_ATE_numeric_string => BaseEncoding::NumericalString,
            constants::DW_ATE_edited => BaseEncoding::Edited,
            constants::DW_ATE_signed_fixed => BaseEncoding::Fixed,
            constants::DW_ATE_unsigned_fixed => BaseEncoding::Ufixed,
            constants::DW_ATE_decimal_float => BaseEncoding::DecimalFloat,
            constants::DW_ATE_UTF => BaseEncoding::Utf,
            constants::DW_ATE_UCS => BaseEncoding::Ucs,
            constants::DW_ATE_ASCII => BaseEncoding::Ascii,
            _ => return None,
        };
        Some(encoding)
    }

    pub fn as_str(self) -> &'static str
    {
        match self {
            BaseEncoding::Void => "void",
            BaseEncoding::Address => "address",
            BaseEncoding::Boolean => "boolean",
            BaseEncoding::ComplexFloat => "complex float",
            BaseEncoding::Float => "float",
            BaseEncoding::Int => "int",
            BaseEncoding::Char => "char",
            BaseEncoding::Uint => "uint",
            BaseEncoding::Uchar => "uchar",
            BaseEncoding::ImaginaryFloat => "imaginary float",
            BaseEncoding::PackedDecimal => "packed decimal",
            BaseEncoding::NumericalString => "numerical string",
            BaseEncoding::Edited => "edited",
            BaseEncoding::Fixed => "fixed",
            BaseEncoding::Ufixed => "ufixed",
            BaseEncoding::DecimalFloat => "decimal float",
            BaseEncoding::Utf => "UTF",
            BaseEncoding::Ucs => "UCS",
            BaseEncoding::Ascii => "ASCII",
        }
    }
}

impl fmt::Display for BaseEncoding
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseEncoding
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        BaseEncoding::ALL
            .into_iter()
            .find(|encoding| encoding.as_str() == s)
            .ok_or_else(|| format!("Unknown base encoding: {s}"))
    }
}

/// Classified kind of a debug entry.
///
/// Qualifiers (`const`, `volatile`, `restrict`, `_Atomic`, ...) are not
/// exported on their own; every edge through one resolves to the qualified
/// type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind
{
    Base(BaseEncoding),
    Unspecified,
    Typedef,
    Structure,
    Union,
    Class,
    Enumeration,
    Pointer,
    /// Lvalue and rvalue references.
    Reference,
    Qualifier,
    Array,
    Subroutine,
    Variable,
    Unknown,
}

impl Kind
{
    /// Struct, union or class.
    pub fn is_composite(self) -> bool
    {
        matches!(self, Kind::Structure | Kind::Union | Kind::Class)
    }

    /// Kinds that may appear as a forward declaration completed elsewhere.
    pub fn is_completable(self) -> bool
    {
        self.is_composite() || matches!(self, Kind::Enumeration | Kind::Variable)
    }

    /// Kinds promoted to root level when reached as a dependency.
    pub fn is_default_root(self) -> bool
    {
        ExportClass::of(self).is_some_and(|class| ExportClass::DEFAULT.contains(&class))
    }

    /// Output `datatype`, if the kind is ever rendered.
    pub fn data_type(self) -> Option<DataType>
    {
        let data_type = match self {
            Kind::Base(encoding) => DataType::Base(encoding),
            Kind::Unspecified => DataType::Unspecified,
            Kind::Typedef => DataType::Typedef,
            Kind::Structure => DataType::Struct,
            Kind::Union => DataType::Union,
            Kind::Class => DataType::Class,
            Kind::Enumeration => DataType::Enumeration,
            Kind::Pointer => DataType::Pointer,
            Kind::Reference => DataType::Reference,
            Kind::Array => DataType::Array,
            Kind::Subroutine => DataType::Subroutine,
            Kind::Variable => DataType::Variable,
            Kind::Qualifier | Kind::Unknown => return None,
        };
        Some(data_type)
    }
}

/// Classify an entry by tag and, for base types, encoding.
pub fn classify(entry: &DebugEntry) -> Kind
{
    match entry.tag {
        constants::DW_TAG_base_type => entry
            .attrs
            .encoding
            .and_then(BaseEncoding::from_dwarf)
            .map_or(Kind::Unknown, Kind::Base),
        constants::DW_TAG_unspecified_type => Kind::Unspecified,
        constants::DW_TAG_typedef => Kind::Typedef,
        constants::DW_TAG_structure_type => Kind::Structure,
        constants::DW_TAG_union_type => Kind::Union,
        constants::DW_TAG_class_type => Kind::Class,
        constants::DW_TAG_enumeration_type => Kind::Enumeration,
        constants::DW_TAG_pointer_type => Kind::Pointer,
        constants::DW_TAG_reference_type | constants::DW_TAG_rvalue_reference_type => Kind::Reference,
        constants::DW_TAG_const_type
        | constants::DW_TAG_volatile_type
        | constants::DW_TAG_restrict_type
        | constants::DW_TAG_atomic_type
        | constants::DW_TAG_packed_type
        | constants::DW_TAG_shared_type
        | constants::DW_TAG_immutable_type => Kind::Qualifier,
        constants::DW_TAG_array_type => Kind::Array,
        constants::DW_TAG_subroutine_type => Kind::Subroutine,
        constants::DW_TAG_variable => Kind::Variable,
        _ => Kind::Unknown,
    }
}

/// Class names accepted by `ByClass` selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportClass
{
    BaseType,
    ClassType,
    EnumerationType,
    StructureType,
    SubroutineType,
    TypeDefType,
    UnionType,
    UnspecifiedType,
    Variable,
}

impl ExportClass
{
    pub const ALL: [ExportClass; 9] = [
        ExportClass::BaseType,
        ExportClass::ClassType,
        ExportClass::EnumerationType,
        ExportClass::StructureType,
        ExportClass::SubroutineType,
        ExportClass::TypeDefType,
        ExportClass::UnionType,
        ExportClass::UnspecifiedType,
        ExportClass::Variable,
    ];

    /// Classes exported when no class is requested, and the classes a
    /// dependency must belong to for root-level promotion.
    pub const DEFAULT: [ExportClass; 6] = [
        ExportClass::ClassType,
        ExportClass::EnumerationType,
        ExportClass::StructureType,
        ExportClass::SubroutineType,
        ExportClass::UnionType,
        ExportClass::Variable,
    ];

    /// Export class of a kind. Pointers, arrays, qualifiers and unknown
    /// entries have none.
    pub fn of(kind: Kind) -> Option<Self>
    {
        let class = match kind {
            Kind::Base(_) => ExportClass::BaseType,
            Kind::Class => ExportClass::ClassType,
            Kind::Enumeration => ExportClass::EnumerationType,
            Kind::Structure => ExportClass::StructureType,
            Kind::Subroutine => ExportClass::SubroutineType,
            Kind::Typedef => ExportClass::TypeDefType,
            Kind::Union => ExportClass::UnionType,
            Kind::Unspecified => ExportClass::UnspecifiedType,
            Kind::Variable => ExportClass::Variable,
            Kind::Pointer | Kind::Reference | Kind::Qualifier | Kind::Array | Kind::Unknown => return None,
        };
        Some(class)
    }

    pub fn as_str(self) -> &'static str
    {
        match self {
            ExportClass::BaseType => "BaseType",
            ExportClass::ClassType => "ClassType",
            ExportClass::EnumerationType => "EnumerationType",
            ExportClass::StructureType => "StructureType",
            ExportClass::SubroutineType => "SubroutineType",
            ExportClass::TypeDefType => "TypeDefType",
            ExportClass::UnionType => "UnionType",
            ExportClass::UnspecifiedType => "UnspecifiedType",
            ExportClass::Variable => "Variable",
        }
    }
}

impl fmt::Display for ExportClass
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportClass
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        ExportClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| {
                let choices: Vec<&str> = ExportClass::ALL.iter().map(|class| class.as_str()).collect();
                format!("Unknown export class: {s}. Use one of {}", choices.join(", "))
            })
    }
}

/// Value of the `datatype` field in exported records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType
{
    Base(BaseEncoding),
    Unspecified,
    Typedef,
    Struct,
    Union,
    Class,
    Enumeration,
    Pointer,
    Reference,
    Array,
    Subroutine,
    Variable,
}

impl DataType
{
    pub fn as_str(self) -> &'static str
    {
        match self {
            DataType::Base(encoding) => encoding.as_str(),
            DataType::Unspecified => "unspecified",
            DataType::Typedef => "typedef",
            DataType::Struct => "struct",
            DataType::Union => "union",
            DataType::Class => "class",
            DataType::Enumeration => "enumeration",
            DataType::Pointer => "pointer",
            DataType::Reference => "reference",
            DataType::Array => "array",
            DataType::Subroutine => "subroutine",
            DataType::Variable => "variable",
        }
    }
}

impl fmt::Display for DataType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let data_type = match s {
            "unspecified" => DataType::Unspecified,
            "typedef" => DataType::Typedef,
            "struct" => DataType::Struct,
            "union" => DataType::Union,
            "class" => DataType::Class,
            "enumeration" => DataType::Enumeration,
            "pointer" => DataType::Pointer,
            "reference" => DataType::Reference,
            "array" => DataType::Array,
            "subroutine" => DataType::Subroutine,
            "variable" => DataType::Variable,
            other => DataType::Base(other.parse().map_err(|_| format!("Unknown datatype: {other}"))?),
        };
        Ok(data_type)
    }
}

impl Serialize for DataType
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DataType
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error>
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for BaseEncoding
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BaseEncoding
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error>
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_base_encoding_round_trips_through_str()
    {
        for encoding in BaseEncoding::ALL {
            assert_eq!(encoding.as_str().parse::<BaseEncoding>().unwrap(), encoding);
        }
    }

    #[test]
    fn test_export_class_from_str()
    {
        assert_eq!("StructureType".parse::<ExportClass>().unwrap(), ExportClass::StructureType);
        assert_eq!("TypeDefType".parse::<ExportClass>().unwrap(), ExportClass::TypeDefType);
        let err = "structure".parse::<ExportClass>().unwrap_err();
        assert!(err.contains("StructureType"));
    }

    #[test]
    fn test_default_roots()
    {
        assert!(Kind::Structure.is_default_root());
        assert!(Kind::Variable.is_default_root());
        assert!(Kind::Subroutine.is_default_root());
        assert!(!Kind::Typedef.is_default_root());
        assert!(!Kind::Base(BaseEncoding::Int).is_default_root());
        assert!(!Kind::Pointer.is_default_root());
    }
}
