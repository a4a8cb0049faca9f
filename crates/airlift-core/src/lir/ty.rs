/// Types of the low-level input IR. Integer types are signless; signedness is
/// recovered during import.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LirType {
    I1,
    I8,
    I16,
    I32,
    I64,
    I128,
    F32,
    F64,
    Ptr(Box<LirType>),
    Array(Box<LirType>, u64),
    Struct {
        fields: Vec<LirType>,
        packed: bool,
        name: Option<String>,
    },
    Function {
        return_type: Box<LirType>,
        param_types: Vec<LirType>,
        is_variadic: bool,
    },
    Vector(Box<LirType>, u32),
    Void,
}

impl LirType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            LirType::I1 | LirType::I8 | LirType::I16 | LirType::I32 | LirType::I64 | LirType::I128
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, LirType::F32 | LirType::F64)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, LirType::Ptr(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, LirType::Void)
    }

    pub fn pointer_to(pointee: LirType) -> LirType {
        LirType::Ptr(Box::new(pointee))
    }

    pub fn pointee(&self) -> Option<&LirType> {
        match self {
            LirType::Ptr(pointee) => Some(pointee),
            _ => None,
        }
    }

    /// Bit-width of an integer type.
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            LirType::I1 => Some(1),
            LirType::I8 => Some(8),
            LirType::I16 => Some(16),
            LirType::I32 => Some(32),
            LirType::I64 => Some(64),
            LirType::I128 => Some(128),
            _ => None,
        }
    }

    pub fn integer_with_width(bits: u32) -> Option<LirType> {
        match bits {
            1 => Some(LirType::I1),
            8 => Some(LirType::I8),
            16 => Some(LirType::I16),
            32 => Some(LirType::I32),
            64 => Some(LirType::I64),
            128 => Some(LirType::I128),
            _ => None,
        }
    }
}
