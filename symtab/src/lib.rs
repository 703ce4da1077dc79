use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Opaque handle into the symbol table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SymIndex(u32);

/// Handle into the name pool.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NameId(u32);

// The built-in nametypes are installed by `SymTab::new` at fixed slots, so
// every other crate can refer to them without a table in hand.
pub const VOID_TYPE: SymIndex = SymIndex(0);
pub const INTEGER_TYPE: SymIndex = SymIndex(1);
pub const REAL_TYPE: SymIndex = SymIndex(2);

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Real(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Undef,
    NameType,
    Var,
    Const {
        value: ConstValue,
    },
    /// `preceding` links to the parameter declared before this one, so a
    /// routine's `last_param` heads a chain in reverse declaration order.
    Param {
        preceding: Option<SymIndex>,
    },
    Array {
        cardinality: i64,
    },
    Proc {
        ar_size: i64,
        label: u32,
        last_param: Option<SymIndex>,
    },
    Func {
        ar_size: i64,
        label: u32,
        last_param: Option<SymIndex>,
    },
}

/// One table entry. `ty` always refers to a `NameType` entry: an array's
/// element type, a function's return type, `VOID_TYPE` for procedures.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: NameId,
    pub level: u32,
    pub offset: i64,
    pub ty: SymIndex,
    pub kind: SymbolKind,
}

impl Symbol {
    /// Frame size, entry label and parameter chain shared by both
    /// routine kinds.
    pub const fn routine_parts(&self) -> Option<(i64, u32, Option<SymIndex>)> {
        match self.kind {
            SymbolKind::Proc {
                ar_size,
                label,
                last_param,
            }
            | SymbolKind::Func {
                ar_size,
                label,
                last_param,
            } => Some((ar_size, label, last_param)),
            _ => None,
        }
    }
}

/// Interned name storage: one handle per distinct spelling.
struct Pool {
    map: HashMap<Rc<str>, u32>,
    vec: Vec<Rc<str>>,
}

impl Pool {
    fn with_capacity(capacity: usize) -> Self {
        Pool {
            map: HashMap::with_capacity(capacity),
            vec: Vec::with_capacity(capacity),
        }
    }

    fn intern(&mut self, name: &str) -> NameId {
        if let Some(&id) = self.map.get(name) {
            return NameId(id);
        }
        let key: Rc<str> = name.into();
        let id = u32::try_from(self.vec.len()).expect("name pool exhausted");
        self.vec.push(Rc::clone(&key));
        self.map.insert(key, id);
        NameId(id)
    }

    fn lookup(&self, id: NameId) -> &str {
        &self.vec[id.0 as usize]
    }
}

/// The process-wide symbol table, arena-allocated and addressed through
/// `SymIndex` handles. The front end fills it via the `enter_*`
/// constructors; the backend passes only read it, apart from the label
/// counter the code generator draws fresh labels from.
pub struct SymTab {
    pool: Pool,
    symbols: Vec<Symbol>,
    labels: u32,
    env: SymIndex,
}

impl SymTab {
    pub fn new() -> Self {
        let mut table = SymTab {
            pool: Pool::with_capacity(64),
            symbols: Vec::with_capacity(64),
            labels: 0,
            env: VOID_TYPE,
        };
        for name in ["void", "integer", "real"] {
            let id = table.pool.intern(name);
            let slot = table.install(Symbol {
                id,
                level: 0,
                offset: 0,
                ty: VOID_TYPE,
                kind: SymbolKind::NameType,
            });
            // a nametype is its own type
            table.symbols[slot.0 as usize].ty = slot;
        }
        table
    }

    fn install(&mut self, sym: Symbol) -> SymIndex {
        let index = u32::try_from(self.symbols.len()).expect("symbol table exhausted");
        self.symbols.push(sym);
        SymIndex(index)
    }

    pub fn intern(&mut self, name: &str) -> NameId {
        self.pool.intern(name)
    }

    pub fn pool_lookup(&self, id: NameId) -> &str {
        self.pool.lookup(id)
    }

    pub fn get_symbol(&self, index: SymIndex) -> &Symbol {
        &self.symbols[index.0 as usize]
    }

    pub fn symbol_name(&self, index: SymIndex) -> &str {
        self.pool_lookup(self.get_symbol(index).id)
    }

    /// Fresh, globally unique label number.
    pub fn get_next_label(&mut self) -> u32 {
        self.labels += 1;
        self.labels
    }

    pub const fn current_environment(&self) -> SymIndex {
        self.env
    }

    pub fn set_environment(&mut self, env: SymIndex) {
        self.env = env;
    }

    pub fn enter_variable(&mut self, name: &str, level: u32, offset: i64, ty: SymIndex) -> SymIndex {
        let id = self.intern(name);
        self.install(Symbol {
            id,
            level,
            offset,
            ty,
            kind: SymbolKind::Var,
        })
    }

    pub fn enter_parameter(
        &mut self,
        name: &str,
        level: u32,
        offset: i64,
        ty: SymIndex,
        preceding: Option<SymIndex>,
    ) -> SymIndex {
        let id = self.intern(name);
        self.install(Symbol {
            id,
            level,
            offset,
            ty,
            kind: SymbolKind::Param { preceding },
        })
    }

    pub fn enter_constant(
        &mut self,
        name: &str,
        level: u32,
        ty: SymIndex,
        value: ConstValue,
    ) -> SymIndex {
        let id = self.intern(name);
        self.install(Symbol {
            id,
            level,
            offset: 0,
            ty,
            kind: SymbolKind::Const { value },
        })
    }

    pub fn enter_array(
        &mut self,
        name: &str,
        level: u32,
        offset: i64,
        elem_ty: SymIndex,
        cardinality: i64,
    ) -> SymIndex {
        let id = self.intern(name);
        self.install(Symbol {
            id,
            level,
            offset,
            ty: elem_ty,
            kind: SymbolKind::Array { cardinality },
        })
    }

    pub fn enter_procedure(&mut self, name: &str, level: u32) -> SymIndex {
        let label = self.get_next_label();
        let id = self.intern(name);
        self.install(Symbol {
            id,
            level,
            offset: 0,
            ty: VOID_TYPE,
            kind: SymbolKind::Proc {
                ar_size: 0,
                label,
                last_param: None,
            },
        })
    }

    pub fn enter_function(&mut self, name: &str, level: u32, ret_ty: SymIndex) -> SymIndex {
        let label = self.get_next_label();
        let id = self.intern(name);
        self.install(Symbol {
            id,
            level,
            offset: 0,
            ty: ret_ty,
            kind: SymbolKind::Func {
                ar_size: 0,
                label,
                last_param: None,
            },
        })
    }

    /// Record the activation-record size of a routine once its declarations
    /// have all been entered.
    pub fn set_ar_size(&mut self, routine: SymIndex, size: i64) {
        match &mut self.symbols[routine.0 as usize].kind {
            SymbolKind::Proc { ar_size, .. } | SymbolKind::Func { ar_size, .. } => *ar_size = size,
            other => panic!("set_ar_size on non-routine symbol: {other:?}"),
        }
    }

    /// Hang `param` at the head of a routine's reversed parameter chain.
    pub fn set_last_param(&mut self, routine: SymIndex, param: SymIndex) {
        match &mut self.symbols[routine.0 as usize].kind {
            SymbolKind::Proc { last_param, .. } | SymbolKind::Func { last_param, .. } => {
                *last_param = Some(param)
            }
            other => panic!("set_last_param on non-routine symbol: {other:?}"),
        }
    }
}

impl Default for SymTab {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SymTab {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut list = f.debug_list();
        for (i, sym) in self.symbols.iter().enumerate() {
            list.entry(&format_args!(
                "#{i} {} level {} offset {} {:?}",
                self.pool.lookup(sym.id),
                sym.level,
                sym.offset,
                sym.kind
            ));
        }
        list.finish()
    }
}
