//! Translation of LIR types and debug types into AIR types.

use airlift_core::air::{AirType, FloatSemantics, Signedness};
use airlift_core::lir::{DataLayout, DiEncoding, DiType, LirType};

/// Translates LIR types into AIR types, attaching a signedness to every
/// integer type.
pub struct TypeImporter<'a> {
    pub layout: &'a DataLayout,
}

impl<'a> TypeImporter<'a> {
    pub fn new(layout: &'a DataLayout) -> Self {
        Self { layout }
    }

    /// The platform size type, as an unsigned integer.
    pub fn size_type(&self) -> AirType {
        AirType::unsigned(self.layout.size_type_bits())
    }

    /// Translate a LIR type, using `preferred` for every integer type
    /// encountered.
    pub fn translate_type(&self, ty: &LirType, preferred: Signedness) -> AirType {
        match ty {
            LirType::I1
            | LirType::I8
            | LirType::I16
            | LirType::I32
            | LirType::I64
            | LirType::I128 => AirType::integer(ty.bit_width().unwrap(), preferred),
            LirType::F32 => AirType::Float(FloatSemantics::F32),
            LirType::F64 => AirType::Float(FloatSemantics::F64),
            LirType::Ptr(pointee) => {
                AirType::pointer_to(self.translate_type(pointee, preferred))
            }
            LirType::Array(element, count) => AirType::Array {
                element: Box::new(self.translate_type(element, preferred)),
                count: *count,
            },
            // Vectors are treated as arrays of their scalar type.
            LirType::Vector(element, count) => AirType::Array {
                element: Box::new(self.translate_type(element, preferred)),
                count: *count as u64,
            },
            LirType::Struct { fields, packed, .. } => AirType::Struct {
                fields: fields
                    .iter()
                    .map(|field| self.translate_type(field, preferred))
                    .collect(),
                packed: *packed,
            },
            LirType::Function {
                return_type,
                param_types,
                is_variadic,
            } => AirType::Function {
                params: param_types
                    .iter()
                    .map(|param| self.translate_type(param, preferred))
                    .collect(),
                ret: Box::new(self.translate_type(return_type, preferred)),
                var_arg: *is_variadic,
            },
            LirType::Void => AirType::Void,
        }
    }

    /// Translate a LIR type using the signedness recorded in the matching
    /// debug type. Where the debug type does not line up structurally, the
    /// LIR type wins with a signed preference.
    pub fn translate_di_type(&self, di_type: &DiType, ty: &LirType) -> AirType {
        match (di_type, ty) {
            (DiType::Basic { encoding, .. }, _) if ty.is_integer() => {
                let sign = match encoding {
                    DiEncoding::Bool => Signedness::Unsigned,
                    encoding if encoding.is_signed() => Signedness::Signed,
                    _ => Signedness::Unsigned,
                };
                AirType::integer(ty.bit_width().unwrap(), sign)
            }
            (DiType::Basic { .. }, _) if ty.is_float() => {
                self.translate_type(ty, Signedness::Signed)
            }
            (DiType::Pointer(di_pointee), LirType::Ptr(pointee)) => {
                AirType::pointer_to(self.translate_di_type(di_pointee, pointee))
            }
            (DiType::Array { element, .. }, LirType::Array(elem_ty, count)) => AirType::Array {
                element: Box::new(self.translate_di_type(element, elem_ty)),
                count: *count,
            },
            (DiType::Struct { members, .. }, LirType::Struct { fields, packed, .. })
                if members.len() == fields.len() =>
            {
                AirType::Struct {
                    fields: members
                        .iter()
                        .zip(fields)
                        .map(|(member, field)| self.translate_di_type(member, field))
                        .collect(),
                    packed: *packed,
                }
            }
            _ => self.translate_type(ty, Signedness::Signed),
        }
    }

    /// Whether a debug type is structurally compatible with a LIR type.
    pub fn match_di_type(&self, di_type: &DiType, ty: &LirType) -> bool {
        match (di_type, ty) {
            (DiType::Basic { bits, encoding, .. }, _) if ty.is_integer() => {
                match encoding {
                    // Bools are i1 in registers and i8 in memory.
                    DiEncoding::Bool => matches!(ty, LirType::I1 | LirType::I8),
                    _ => ty.bit_width() == Some(*bits),
                }
            }
            (DiType::Basic { bits, encoding, .. }, _) if ty.is_float() => {
                *encoding == DiEncoding::Float
                    && match ty {
                        LirType::F32 => *bits == 32,
                        LirType::F64 => *bits == 64,
                        _ => false,
                    }
            }
            (DiType::Pointer(di_pointee), LirType::Ptr(pointee)) => {
                self.match_di_type(di_pointee, pointee)
            }
            (
                DiType::Array { element, count },
                LirType::Array(elem_ty, lir_count),
            ) => *count == *lir_count && self.match_di_type(element, elem_ty),
            (DiType::Struct { members, .. }, LirType::Struct { fields, .. }) => {
                members.len() == fields.len()
                    && members
                        .iter()
                        .zip(fields)
                        .all(|(member, field)| self.match_di_type(member, field))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_signedness_follows_preference() {
        let layout = DataLayout::default();
        let types = TypeImporter::new(&layout);
        assert_eq!(
            types.translate_type(&LirType::I32, Signedness::Unsigned),
            AirType::unsigned(32)
        );
        assert_eq!(
            types.translate_type(&LirType::pointer_to(LirType::I8), Signedness::Signed),
            AirType::pointer_to(AirType::signed(8))
        );
    }

    #[test]
    fn di_type_decides_the_sign() {
        let layout = DataLayout::default();
        let types = TypeImporter::new(&layout);
        let di = DiType::basic("unsigned int", 32, DiEncoding::Unsigned);
        assert!(types.match_di_type(&di, &LirType::I32));
        assert!(!types.match_di_type(&di, &LirType::I64));
        assert_eq!(
            types.translate_di_type(&di, &LirType::I32),
            AirType::unsigned(32)
        );
    }

    #[test]
    fn mismatching_di_type_falls_back_to_the_lir_type() {
        let layout = DataLayout::default();
        let types = TypeImporter::new(&layout);
        let di = DiType::basic("int", 32, DiEncoding::Signed);
        assert_eq!(
            types.translate_di_type(&di, &LirType::pointer_to(LirType::I8)),
            AirType::pointer_to(AirType::signed(8))
        );
    }
}
