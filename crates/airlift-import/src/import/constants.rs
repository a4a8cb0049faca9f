//! Translation of LIR constants into AIR operands.

use airlift_core::air::{AirType, Operand, Signedness};
use airlift_core::error::ImportError;
use airlift_core::lir::Constant;
use airlift_core::Result;

use super::types::TypeImporter;

/// Translates LIR constants, re-typing integers to the requested AIR type.
pub struct ConstantImporter<'a> {
    pub types: TypeImporter<'a>,
}

impl<'a> ConstantImporter<'a> {
    pub fn new(types: TypeImporter<'a>) -> Self {
        Self { types }
    }

    /// Translate a constant. When `ty` is given the constant is produced at
    /// that type; otherwise the LIR type is translated with a signed
    /// preference.
    pub fn translate_constant(&self, cst: &Constant, ty: Option<&AirType>) -> Result<Operand> {
        let target = match ty {
            Some(ty) => ty.clone(),
            None => self.types.translate_type(cst.ty(), Signedness::Signed),
        };

        match cst {
            Constant::Int(value, _) => {
                if !target.is_integer() {
                    return Err(ImportError::UnexpectedType {
                        context: "translate_constant",
                    });
                }
                Ok(Operand::Int {
                    value: wrap_to_width(*value, &target),
                    ty: target,
                })
            }
            Constant::Float(value, _) => {
                if !target.is_float() {
                    return Err(ImportError::UnexpectedType {
                        context: "translate_constant",
                    });
                }
                Ok(Operand::Float {
                    value: *value,
                    ty: target,
                })
            }
            Constant::Null(_) => {
                if !target.is_pointer() {
                    return Err(ImportError::UnexpectedType {
                        context: "translate_constant",
                    });
                }
                Ok(Operand::Null { ty: target })
            }
            Constant::Undef(_) => Ok(Operand::Undef { ty: target }),
        }
    }

    /// Translate an integer constant to the given integer type, wrapping the
    /// value to the target width.
    pub fn translate_cast_integer_constant(
        &self,
        cst: &Constant,
        ty: &AirType,
    ) -> Result<Operand> {
        match cst {
            Constant::Int(value, _) => Ok(Operand::Int {
                value: wrap_to_width(*value, ty),
                ty: ty.clone(),
            }),
            Constant::Undef(_) => Ok(Operand::Undef { ty: ty.clone() }),
            _ => Err(ImportError::InvalidOperand {
                context: "translate_cast_integer_constant",
            }),
        }
    }
}

/// Wrap a constant to the bit-width and signedness of an integer type.
fn wrap_to_width(value: i64, ty: &AirType) -> i128 {
    let bits = match ty.bit_width() {
        Some(bits) if bits < 128 => bits,
        _ => return value as i128,
    };
    let mask = (1i128 << bits) - 1;
    let truncated = (value as i128) & mask;
    match ty.sign() {
        Some(Signedness::Signed) if truncated >> (bits - 1) != 0 => truncated - (1i128 << bits),
        _ => truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlift_core::lir::{DataLayout, LirType};

    fn importer(layout: &DataLayout) -> ConstantImporter<'_> {
        ConstantImporter::new(TypeImporter::new(layout))
    }

    #[test]
    fn integer_constants_wrap_to_the_target_width() {
        let layout = DataLayout::default();
        let constants = importer(&layout);
        let cst = Constant::Int(-1, LirType::I32);

        let unsigned = constants
            .translate_cast_integer_constant(&cst, &AirType::unsigned(8))
            .unwrap();
        assert_eq!(unsigned.as_int(), Some(255));

        let signed = constants
            .translate_cast_integer_constant(&cst, &AirType::signed(8))
            .unwrap();
        assert_eq!(signed.as_int(), Some(-1));
    }

    #[test]
    fn untargeted_constants_prefer_signed() {
        let layout = DataLayout::default();
        let constants = importer(&layout);
        let operand = constants
            .translate_constant(&Constant::Int(7, LirType::I64), None)
            .unwrap();
        assert_eq!(
            operand,
            Operand::Int {
                value: 7,
                ty: AirType::signed(64)
            }
        );
    }
}
