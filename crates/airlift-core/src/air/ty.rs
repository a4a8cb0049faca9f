//! Types and operators of the analysis IR.
//!
//! Unlike LIR, every integer type carries an explicit signedness. Two integer
//! types with the same width but different signs are distinct types; they are
//! reconciled with bitcasts.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signedness {
    Signed,
    Unsigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatSemantics {
    F32,
    F64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AirType {
    Integer {
        bits: u32,
        sign: Signedness,
    },
    Float(FloatSemantics),
    Pointer(Box<AirType>),
    Array {
        element: Box<AirType>,
        count: u64,
    },
    Struct {
        fields: Vec<AirType>,
        packed: bool,
    },
    Function {
        params: Vec<AirType>,
        ret: Box<AirType>,
        var_arg: bool,
    },
    Void,
}

impl AirType {
    pub fn signed(bits: u32) -> AirType {
        AirType::Integer {
            bits,
            sign: Signedness::Signed,
        }
    }

    pub fn unsigned(bits: u32) -> AirType {
        AirType::Integer {
            bits,
            sign: Signedness::Unsigned,
        }
    }

    pub fn integer(bits: u32, sign: Signedness) -> AirType {
        AirType::Integer { bits, sign }
    }

    pub fn pointer_to(pointee: AirType) -> AirType {
        AirType::Pointer(Box::new(pointee))
    }

    /// `si8*`, the untyped byte pointer used by memory intrinsics.
    pub fn void_pointer() -> AirType {
        AirType::pointer_to(AirType::signed(8))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, AirType::Integer { .. })
    }

    pub fn is_float(&self) -> bool {
        matches!(self, AirType::Float(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, AirType::Pointer(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, AirType::Void)
    }

    pub fn bit_width(&self) -> Option<u32> {
        match self {
            AirType::Integer { bits, .. } => Some(*bits),
            _ => None,
        }
    }

    pub fn sign(&self) -> Option<Signedness> {
        match self {
            AirType::Integer { sign, .. } => Some(*sign),
            _ => None,
        }
    }

    pub fn pointee(&self) -> Option<&AirType> {
        match self {
            AirType::Pointer(pointee) => Some(pointee),
            _ => None,
        }
    }

    pub fn return_type(&self) -> Option<&AirType> {
        match self {
            AirType::Function { ret, .. } => Some(ret),
            _ => None,
        }
    }

    pub fn param_types(&self) -> &[AirType] {
        match self {
            AirType::Function { params, .. } => params,
            _ => &[],
        }
    }

    pub fn is_var_arg(&self) -> bool {
        matches!(self, AirType::Function { var_arg: true, .. })
    }

    /// Whether a bitcast between the two types is legal: pointer to pointer,
    /// or integer to integer of the same bit-width.
    pub fn bitcast_compatible(&self, other: &AirType) -> bool {
        (self.is_pointer() && other.is_pointer())
            || matches!(
                (self, other),
                (
                    AirType::Integer { bits: a, .. },
                    AirType::Integer { bits: b, .. }
                ) if a == b
            )
    }
}

impl fmt::Display for AirType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AirType::Integer {
                bits,
                sign: Signedness::Signed,
            } => write!(f, "si{}", bits),
            AirType::Integer {
                bits,
                sign: Signedness::Unsigned,
            } => write!(f, "ui{}", bits),
            AirType::Float(FloatSemantics::F32) => write!(f, "float"),
            AirType::Float(FloatSemantics::F64) => write!(f, "double"),
            AirType::Pointer(pointee) => write!(f, "{}*", pointee),
            AirType::Array { element, count } => write!(f, "[{} x {}]", count, element),
            AirType::Struct { fields, packed } => {
                if *packed {
                    write!(f, "<")?;
                }
                write!(f, "{{")?;
                for (index, field) in fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, "}}")?;
                if *packed {
                    write!(f, ">")?;
                }
                Ok(())
            }
            AirType::Function {
                params,
                ret,
                var_arg,
            } => {
                write!(f, "{} (", ret)?;
                for (index, param) in params.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                if *var_arg {
                    if !params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
            AirType::Void => write!(f, "void"),
        }
    }
}

/// Unary operations; integer casts are split by signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    UTrunc,
    STrunc,
    ZExt,
    SExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    FPTrunc,
    FPExt,
    PtrToUI,
    PtrToSI,
    UIToPtr,
    SIToPtr,
    Bitcast,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::UTrunc => "utrunc",
            UnaryOp::STrunc => "strunc",
            UnaryOp::ZExt => "zext",
            UnaryOp::SExt => "sext",
            UnaryOp::FPToUI => "fptoui",
            UnaryOp::FPToSI => "fptosi",
            UnaryOp::UIToFP => "uitofp",
            UnaryOp::SIToFP => "sitofp",
            UnaryOp::FPTrunc => "fptrunc",
            UnaryOp::FPExt => "fpext",
            UnaryOp::PtrToUI => "ptrtoui",
            UnaryOp::PtrToSI => "ptrtosi",
            UnaryOp::UIToPtr => "uitoptr",
            UnaryOp::SIToPtr => "sitoptr",
            UnaryOp::Bitcast => "bitcast",
        }
    }
}

/// Binary operations with signed/unsigned integer variants and float
/// variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    UAdd,
    SAdd,
    USub,
    SSub,
    UMul,
    SMul,
    UDiv,
    SDiv,
    URem,
    SRem,
    UShl,
    SShl,
    ULShr,
    SLShr,
    UAShr,
    SAShr,
    UAnd,
    SAnd,
    UOr,
    SOr,
    UXor,
    SXor,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::UAdd => "uadd",
            BinaryOp::SAdd => "sadd",
            BinaryOp::USub => "usub",
            BinaryOp::SSub => "ssub",
            BinaryOp::UMul => "umul",
            BinaryOp::SMul => "smul",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::URem => "urem",
            BinaryOp::SRem => "srem",
            BinaryOp::UShl => "ushl",
            BinaryOp::SShl => "sshl",
            BinaryOp::ULShr => "ulshr",
            BinaryOp::SLShr => "slshr",
            BinaryOp::UAShr => "uashr",
            BinaryOp::SAShr => "sashr",
            BinaryOp::UAnd => "uand",
            BinaryOp::SAnd => "sand",
            BinaryOp::UOr => "uor",
            BinaryOp::SOr => "sor",
            BinaryOp::UXor => "uxor",
            BinaryOp::SXor => "sxor",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::FRem => "frem",
        }
    }
}

/// Comparison predicates: signed integer, unsigned integer, pointer and
/// float families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    SIEQ,
    SINE,
    SIGT,
    SIGE,
    SILT,
    SILE,
    UIEQ,
    UINE,
    UIGT,
    UIGE,
    UILT,
    UILE,
    PEQ,
    PNE,
    PGT,
    PGE,
    PLT,
    PLE,
    FOEQ,
    FOGT,
    FOGE,
    FOLT,
    FOLE,
    FONE,
    FORD,
    FUNO,
    FUEQ,
    FUGT,
    FUGE,
    FULT,
    FULE,
    FUNE,
}

impl Predicate {
    /// The logically complementary predicate.
    pub fn inverse(self) -> Predicate {
        use Predicate::*;
        match self {
            SIEQ => SINE,
            SINE => SIEQ,
            SIGT => SILE,
            SIGE => SILT,
            SILT => SIGE,
            SILE => SIGT,
            UIEQ => UINE,
            UINE => UIEQ,
            UIGT => UILE,
            UIGE => UILT,
            UILT => UIGE,
            UILE => UIGT,
            PEQ => PNE,
            PNE => PEQ,
            PGT => PLE,
            PGE => PLT,
            PLT => PGE,
            PLE => PGT,
            FOEQ => FUNE,
            FOGT => FULE,
            FOGE => FULT,
            FOLT => FUGE,
            FOLE => FUGT,
            FONE => FUEQ,
            FORD => FUNO,
            FUNO => FORD,
            FUEQ => FONE,
            FUGT => FOLE,
            FUGE => FOLT,
            FULT => FOGE,
            FULE => FOGT,
            FUNE => FOEQ,
        }
    }

    pub fn name(self) -> &'static str {
        use Predicate::*;
        match self {
            SIEQ => "sieq",
            SINE => "sine",
            SIGT => "sigt",
            SIGE => "sige",
            SILT => "silt",
            SILE => "sile",
            UIEQ => "uieq",
            UINE => "uine",
            UIGT => "uigt",
            UIGE => "uige",
            UILT => "uilt",
            UILE => "uile",
            PEQ => "peq",
            PNE => "pne",
            PGT => "pgt",
            PGE => "pge",
            PLT => "plt",
            PLE => "ple",
            FOEQ => "foeq",
            FOGT => "fogt",
            FOGE => "foge",
            FOLT => "folt",
            FOLE => "fole",
            FONE => "fone",
            FORD => "ford",
            FUNO => "funo",
            FUEQ => "fueq",
            FUGT => "fugt",
            FUGE => "fuge",
            FULT => "fult",
            FULE => "fule",
            FUNE => "fune",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_is_an_involution() {
        use Predicate::*;
        let all = [
            SIEQ, SINE, SIGT, SIGE, SILT, SILE, UIEQ, UINE, UIGT, UIGE, UILT, UILE, PEQ, PNE, PGT,
            PGE, PLT, PLE, FOEQ, FOGT, FOGE, FOLT, FOLE, FONE, FORD, FUNO, FUEQ, FUGT, FUGE, FULT,
            FULE, FUNE,
        ];
        for pred in all {
            assert_eq!(pred.inverse().inverse(), pred);
            assert_ne!(pred.inverse(), pred);
        }
    }

    #[test]
    fn same_width_different_sign_is_bitcast_compatible() {
        let signed = AirType::signed(32);
        let unsigned = AirType::unsigned(32);
        assert_ne!(signed, unsigned);
        assert!(signed.bitcast_compatible(&unsigned));
        assert!(!signed.bitcast_compatible(&AirType::unsigned(64)));
        assert!(AirType::pointer_to(signed).bitcast_compatible(&AirType::void_pointer()));
    }
}
