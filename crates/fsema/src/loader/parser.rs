//! Recursive descent parser for program descriptions
//!
//! Words are not reserved, so every keyword check looks at the text of an
//! identifier token and, where a word may start either a declaration or a
//! program unit, at the tokens that follow it.

use std::mem;

use super::ast::*;
use super::scanner::Lexer;
use super::token::{Token, TokenKind};
use crate::common::{SemaError, SemaResult, Span};
use crate::evaluate::{LogicalOperator, RelationalOperator, TypeCategory};
use crate::symbols::{
    Attrs, CudaDataAttr, CudaSubprogramAttrs, DeclTypeSpec, DefinedIo, DerivedCategory, GenericKind, ParamValue,
    ScopeKind, TypeParamAttr,
};

const DEFAULT_KIND: u8 = 4;

/// Words that may start the prefix of a subprogram
const PREFIX_WORDS: &[&str] = &["pure", "impure", "elemental", "recursive", "non_recursive", "module"];

const INTRINSIC_TYPE_WORDS: &[&str] =
    &["integer", "unsigned", "real", "complex", "logical", "character", "doubleprecision", "double"];

pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { lexer: Lexer::new(source) }
    }

    /// Parse a whole source file
    pub fn parse_file(&mut self) -> SemaResult<SourceFile> {
        let mut units = Vec::new();
        loop {
            self.skip_separators()?;
            if self.check(&TokenKind::Eof)? {
                break;
            }
            units.push(self.parse_unit()?);
        }
        Ok(SourceFile { units })
    }

    // ==================== Program units ====================

    fn parse_unit(&mut self) -> SemaResult<Unit> {
        let module_file = self.match_word("modfile")?;
        let intrinsic = if self.check_word("intrinsic")? && self.check_word_at(1, "module")? {
            self.lexer.next_token()?;
            true
        } else {
            false
        };
        let prefix = self.parse_prefix()?;
        self.parse_unit_after_prefix(prefix, module_file, intrinsic)
    }

    fn parse_prefix(&mut self) -> SemaResult<Prefix> {
        let mut prefix = Prefix::default();
        loop {
            let Some(word) = self.peek_word(0)? else {
                break;
            };
            match word.as_str() {
                "module" => {
                    let next = self.peek_word(1)?.unwrap_or_default();
                    let starts_subprogram = next == "subroutine"
                        || next == "function"
                        || PREFIX_WORDS.contains(&next.as_str())
                        || INTRINSIC_TYPE_WORDS.contains(&next.as_str());
                    if !starts_subprogram {
                        break;
                    }
                    self.lexer.next_token()?;
                    prefix.attrs |= Attrs::MODULE;
                }
                "pure" | "impure" | "elemental" | "recursive" => {
                    self.lexer.next_token()?;
                    prefix.attrs |= Attrs::from_keyword(&word).unwrap_or_default();
                }
                "non_recursive" => {
                    self.lexer.next_token()?;
                }
                "bind" => {
                    self.lexer.next_token()?;
                    prefix.bind = Some(self.parse_bind_spec()?);
                    prefix.attrs |= Attrs::BIND_C;
                }
                "attributes" => {
                    self.lexer.next_token()?;
                    prefix.cuda = Some(self.parse_cuda_attributes()?);
                }
                _ if self.is_type_spec_start()? => prefix.ty = Some(self.parse_type_spec()?),
                _ => break,
            }
        }
        Ok(prefix)
    }

    fn parse_unit_after_prefix(&mut self, mut prefix: Prefix, module_file: bool, intrinsic: bool) -> SemaResult<Unit> {
        let token = self.lexer.next_token()?;
        let start = token.span;
        let word = word_of(&token);
        let (kind, name) = match word.as_deref() {
            Some("module") => {
                let name = self.expect_identifier()?;
                (UnitKind::Module { module_file, intrinsic }, name)
            }
            Some("submodule") => {
                self.expect(TokenKind::LParen)?;
                let ancestor = self.expect_identifier()?;
                let parent = if self.match_token(&TokenKind::Colon)? {
                    Some(self.expect_identifier()?)
                } else {
                    None
                };
                self.expect(TokenKind::RParen)?;
                let name = self.expect_identifier()?;
                (UnitKind::Submodule { ancestor, parent }, name)
            }
            Some("program") => (UnitKind::Program, self.expect_identifier()?),
            Some("blockdata") => (UnitKind::BlockData, self.expect_identifier()?),
            Some("block") => {
                self.expect_word("data")?;
                (UnitKind::BlockData, self.expect_identifier()?)
            }
            Some(keyword @ ("subroutine" | "function")) => {
                let is_function = keyword == "function";
                let name = self.expect_identifier()?;
                let dummies = if self.check(&TokenKind::LParen)? {
                    self.parse_dummy_list()?
                } else {
                    Vec::new()
                };
                let mut result = None;
                loop {
                    if is_function && self.match_word("result")? {
                        self.expect(TokenKind::LParen)?;
                        result = Some(self.expect_identifier()?);
                        self.expect(TokenKind::RParen)?;
                    } else if self.match_word("bind")? {
                        prefix.bind = Some(self.parse_bind_spec()?);
                        prefix.attrs |= Attrs::BIND_C;
                    } else {
                        break;
                    }
                }
                let header = SubprogramHeader { is_function, dummies, result };
                (UnitKind::Subprogram(header), name)
            }
            _ => {
                return Err(SemaError::parser(
                    format!("expected program unit, found {}", token.kind),
                    token.span,
                ));
            }
        };
        let body = self.parse_body()?;
        let end = self.last_span_end();
        Ok(Unit { kind, name, prefix, body, span: Span::new(start.start, end.max(start.end)) })
    }

    fn parse_dummy_list(&mut self) -> SemaResult<Vec<Option<Ident>>> {
        self.expect(TokenKind::LParen)?;
        let mut dummies = Vec::new();
        if self.match_token(&TokenKind::RParen)? {
            return Ok(dummies);
        }
        loop {
            if self.match_token(&TokenKind::Star)? {
                dummies.push(None);
            } else {
                dummies.push(Some(self.expect_identifier()?));
            }
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(dummies)
    }

    /// `( c [, name = "label"] )` after `bind`
    fn parse_bind_spec(&mut self) -> SemaResult<BindSpec> {
        self.expect(TokenKind::LParen)?;
        self.expect_word("c")?;
        let mut name = None;
        if self.match_token(&TokenKind::Comma)? {
            self.expect_word("name")?;
            self.expect(TokenKind::Eq)?;
            let token = self.lexer.next_token()?;
            match token.kind {
                TokenKind::Str(label) => name = Some(label),
                other => {
                    return Err(SemaError::parser(format!("expected binding label, found {other}"), token.span));
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(BindSpec { name })
    }

    /// `( host | device | global | grid_global [, ...] )` after `attributes`
    fn parse_cuda_attributes(&mut self) -> SemaResult<CudaSubprogramAttrs> {
        self.expect(TokenKind::LParen)?;
        let (mut host, mut device, mut global, mut grid) = (false, false, false, false);
        loop {
            let name = self.expect_identifier()?;
            match name.text.to_ascii_lowercase().as_str() {
                "host" => host = true,
                "device" => device = true,
                "global" => global = true,
                "grid_global" => grid = true,
                other => {
                    return Err(SemaError::parser(format!("unknown CUDA attribute '{other}'"), name.span));
                }
            }
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(if grid {
            CudaSubprogramAttrs::GridGlobal
        } else if global {
            CudaSubprogramAttrs::Global
        } else if host && device {
            CudaSubprogramAttrs::HostDevice
        } else if device {
            CudaSubprogramAttrs::Device
        } else {
            CudaSubprogramAttrs::Host
        })
    }

    fn parse_body(&mut self) -> SemaResult<Vec<Item>> {
        self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();
        loop {
            self.skip_separators()?;
            if self.match_token(&TokenKind::RBrace)? {
                break;
            }
            if self.match_word("contains")? {
                continue;
            }
            items.push(self.parse_item()?);
        }
        Ok(items)
    }

    // ==================== Items ====================

    fn parse_item(&mut self) -> SemaResult<Item> {
        let token = self.lexer.peek()?.clone();
        let Some(word) = word_of(&token) else {
            return Err(SemaError::parser(format!("expected declaration, found {}", token.kind), token.span));
        };

        match word.as_str() {
            "use" => return self.parse_use().map(Item::Use),
            "common" => return self.parse_common(),
            "equivalence" => return self.parse_equivalence(),
            "stmtfunc" => return self.parse_stmt_function(),
            "entry" => return self.parse_entry(),
            "final" => return self.parse_final(),
            "generic" => return self.parse_generic_stmt().map(Item::Generic),
            "sequence" => {
                self.lexer.next_token()?;
                return Ok(Item::Sequence);
            }
            "interface" => return self.parse_interface(false).map(Item::Interface),
            "abstract" if self.check_word_at(1, "interface")? => {
                self.lexer.next_token()?;
                return self.parse_interface(true).map(Item::Interface);
            }
            "procedure" => return self.parse_procedure_decl().map(Item::Procedure),
            "type" if !self.check_at(1, &TokenKind::LParen)? => return self.parse_type_def().map(Item::TypeDef),
            "pointer" if self.check_at(1, &TokenKind::LParen)? => return self.parse_cray_pointer(),
            "block" if self.check_at(1, &TokenKind::LBrace)? => {
                return self.parse_construct(ScopeKind::BlockConstruct).map(Item::Construct);
            }
            "acc" if self.check_at(1, &TokenKind::LBrace)? => {
                return self.parse_construct(ScopeKind::OpenAccConstruct).map(Item::Construct);
            }
            "omp" if self.check_at(1, &TokenKind::LBrace)? => {
                return self.parse_construct(ScopeKind::OpenMpConstruct).map(Item::Construct);
            }
            "associate" if self.check_at(1, &TokenKind::LParen)? => {
                return self.parse_construct(ScopeKind::OtherConstruct).map(Item::Construct);
            }
            _ => {}
        }

        if let Some(attrs) = Attrs::from_keyword(&word)
            && (self.check_at(1, &TokenKind::ColonColon)? || matches!(word.as_str(), "private" | "public"))
        {
            return self.parse_attr_stmt(attrs);
        }

        if self.is_type_spec_start()? {
            let ty = self.parse_type_spec()?;
            if self.check(&TokenKind::Comma)? || self.check(&TokenKind::ColonColon)? {
                return self.parse_type_decl(ty).map(Item::Decl);
            }
            let mut prefix = self.parse_prefix()?;
            prefix.ty = Some(ty);
            return self.parse_unit_after_prefix(prefix, false, false).map(Item::Unit);
        }
        self.parse_unit().map(Item::Unit)
    }

    fn parse_use(&mut self) -> SemaResult<UseStmt> {
        self.expect_word("use")?;
        if self.match_token(&TokenKind::Comma)? {
            // `use, intrinsic :: m` names the same module as `use m`
            self.expect_identifier()?;
            self.expect(TokenKind::ColonColon)?;
        } else {
            self.match_token(&TokenKind::ColonColon)?;
        }
        let module = self.expect_identifier()?;
        let mut only = false;
        let mut renames = Vec::new();
        if self.match_token(&TokenKind::Comma)? {
            if self.check_word("only")? && self.check_at(1, &TokenKind::Colon)? {
                self.lexer.next_token()?;
                self.lexer.next_token()?;
                only = true;
            }
            loop {
                let local = self.expect_identifier()?;
                let remote = if self.match_token(&TokenKind::Arrow)? {
                    self.expect_identifier()?
                } else {
                    local.clone()
                };
                renames.push((local, remote));
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        Ok(UseStmt { module, only, renames })
    }

    fn parse_common(&mut self) -> SemaResult<Item> {
        let keyword = self.expect_word("common")?;
        let mut blocks = Vec::new();
        loop {
            let block = if self.check(&TokenKind::SlashSlash)? {
                let token = self.lexer.next_token()?;
                Ident::new("", token.span)
            } else if self.match_token(&TokenKind::Slash)? {
                let name = self.expect_identifier()?;
                self.expect(TokenKind::Slash)?;
                name
            } else {
                Ident::new("", keyword.span)
            };
            let mut objects = Vec::new();
            loop {
                objects.push(self.expect_identifier()?);
                if self.check(&TokenKind::LParen)? {
                    self.parse_shape_spec()?;
                }
                if !self.check(&TokenKind::Comma)? {
                    break;
                }
                if self.check_at(1, &TokenKind::Slash)? || self.check_at(1, &TokenKind::SlashSlash)? {
                    break;
                }
                self.lexer.next_token()?;
            }
            blocks.push((block, objects));
            self.match_token(&TokenKind::Comma)?;
            if !self.check(&TokenKind::Slash)? && !self.check(&TokenKind::SlashSlash)? {
                break;
            }
        }
        Ok(Item::Common(blocks))
    }

    fn parse_equivalence(&mut self) -> SemaResult<Item> {
        self.expect_word("equivalence")?;
        let mut sets = Vec::new();
        loop {
            self.expect(TokenKind::LParen)?;
            let mut set = Vec::new();
            loop {
                set.push(self.parse_equivalence_ref()?);
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
            sets.push(set);
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        Ok(Item::Equivalence(sets))
    }

    fn parse_equivalence_ref(&mut self) -> SemaResult<EquivalenceRef> {
        let name = self.expect_identifier()?;
        let mut subscripts = Vec::new();
        let mut substring_start = None;
        while self.match_token(&TokenKind::LParen)? {
            loop {
                let at = self.lexer.peek()?.span;
                let value = self.parse_expr()?;
                if self.match_token(&TokenKind::Colon)? {
                    substring_start = Some(value.unwrap_or(1));
                    if !self.check(&TokenKind::RParen)? {
                        self.parse_expr()?;
                    }
                } else {
                    let Some(value) = value else {
                        return Err(SemaError::parser("EQUIVALENCE subscripts must be constant", at));
                    };
                    subscripts.push(value);
                }
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        let end = self.last_span_end();
        let span = Span::new(name.span.start, end.max(name.span.end));
        Ok(EquivalenceRef { name, subscripts, substring_start, span })
    }

    fn parse_cray_pointer(&mut self) -> SemaResult<Item> {
        self.expect_word("pointer")?;
        let mut pairs = Vec::new();
        loop {
            self.expect(TokenKind::LParen)?;
            let pointer = self.expect_identifier()?;
            self.expect(TokenKind::Comma)?;
            let pointee = self.expect_identifier()?;
            if self.check(&TokenKind::LParen)? {
                self.parse_shape_spec()?;
            }
            self.expect(TokenKind::RParen)?;
            pairs.push((pointer, pointee));
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        Ok(Item::CrayPointer(pairs))
    }

    fn parse_stmt_function(&mut self) -> SemaResult<Item> {
        self.expect_word("stmtfunc")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;
        let mut dummies = Vec::new();
        if !self.check(&TokenKind::RParen)? {
            loop {
                dummies.push(self.expect_identifier()?);
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        if self.match_token(&TokenKind::Eq)? {
            self.parse_expr()?;
        }
        Ok(Item::StmtFunction { name, dummies })
    }

    fn parse_entry(&mut self) -> SemaResult<Item> {
        self.expect_word("entry")?;
        let name = self.expect_identifier()?;
        let dummies = if self.check(&TokenKind::LParen)? {
            self.parse_dummy_list()?
        } else {
            Vec::new()
        };
        let result = if self.match_word("result")? {
            self.expect(TokenKind::LParen)?;
            let result = self.expect_identifier()?;
            self.expect(TokenKind::RParen)?;
            Some(result)
        } else {
            None
        };
        Ok(Item::Entry { name, dummies, result })
    }

    fn parse_final(&mut self) -> SemaResult<Item> {
        self.expect_word("final")?;
        self.match_token(&TokenKind::ColonColon)?;
        Ok(Item::Final(self.parse_name_list()?))
    }

    fn parse_attr_stmt(&mut self, attrs: Attrs) -> SemaResult<Item> {
        let keyword = self.lexer.next_token()?;
        if !self.match_token(&TokenKind::ColonColon)? {
            // bare PRIVATE or PUBLIC sets the default accessibility
            return Ok(Item::AttrStmt { attrs, names: Vec::new(), span: keyword.span });
        }
        let names = self.parse_name_list()?;
        Ok(Item::AttrStmt { attrs, names, span: keyword.span })
    }

    fn parse_name_list(&mut self) -> SemaResult<Vec<Ident>> {
        let mut names = Vec::new();
        loop {
            names.push(self.expect_identifier()?);
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        Ok(names)
    }

    // ==================== Derived types and interfaces ====================

    fn parse_type_def(&mut self) -> SemaResult<TypeDef> {
        self.expect_word("type")?;
        let mut attrs = Attrs::empty();
        let mut extends = None;
        let mut bind = None;
        while self.match_token(&TokenKind::Comma)? {
            let attr = self.expect_identifier()?;
            match attr.text.to_ascii_lowercase().as_str() {
                "extends" => {
                    self.expect(TokenKind::LParen)?;
                    extends = Some(self.expect_identifier()?);
                    self.expect(TokenKind::RParen)?;
                    attrs |= Attrs::EXTENDS;
                }
                "bind" => {
                    bind = Some(self.parse_bind_spec()?);
                    attrs |= Attrs::BIND_C;
                }
                word @ ("abstract" | "private" | "public") => attrs |= Attrs::from_keyword(word).unwrap_or_default(),
                other => {
                    return Err(SemaError::parser(format!("unknown type attribute '{other}'"), attr.span));
                }
            }
        }
        self.match_token(&TokenKind::ColonColon)?;
        let name = self.expect_identifier()?;
        let mut params = Vec::new();
        if self.match_token(&TokenKind::LParen)? {
            params = self.parse_name_list()?;
            self.expect(TokenKind::RParen)?;
        }
        let body = self.parse_body()?;
        Ok(TypeDef { name, attrs, extends, bind, params, body })
    }

    fn parse_interface(&mut self, is_abstract: bool) -> SemaResult<InterfaceBlock> {
        self.expect_word("interface")?;
        let generic = if self.check(&TokenKind::LBrace)? {
            None
        } else {
            Some(self.parse_generic_spec()?)
        };
        self.expect(TokenKind::LBrace)?;
        let mut bodies = Vec::new();
        let mut procedures = Vec::new();
        loop {
            self.skip_separators()?;
            if self.match_token(&TokenKind::RBrace)? {
                break;
            }
            let module_procedure = self.check_word("module")? && self.check_word_at(1, "procedure")?;
            if module_procedure || self.check_word("procedure")? {
                if module_procedure {
                    self.lexer.next_token()?;
                }
                self.lexer.next_token()?;
                self.match_token(&TokenKind::ColonColon)?;
                procedures.extend(self.parse_name_list()?);
            } else {
                bodies.push(self.parse_unit()?);
            }
        }
        Ok(InterfaceBlock { is_abstract, generic, bodies, procedures })
    }

    fn parse_generic_stmt(&mut self) -> SemaResult<GenericStmt> {
        self.expect_word("generic")?;
        let mut access = Attrs::empty();
        while self.match_token(&TokenKind::Comma)? {
            let attr = self.expect_identifier()?;
            match Attrs::from_keyword(&attr.text.to_ascii_lowercase()) {
                Some(found) if (Attrs::PRIVATE | Attrs::PUBLIC).contains(found) => access |= found,
                _ => {
                    return Err(SemaError::parser(format!("unexpected attribute '{}' on GENERIC", attr.text), attr.span));
                }
            }
        }
        self.expect(TokenKind::ColonColon)?;
        let spec = self.parse_generic_spec()?;
        self.expect(TokenKind::Arrow)?;
        let specifics = self.parse_name_list()?;
        Ok(GenericStmt { access, spec, specifics })
    }

    /// A generic name, `operator(op)`, `assignment(=)` or a defined I/O spec
    fn parse_generic_spec(&mut self) -> SemaResult<GenericSpec> {
        let name = self.expect_identifier()?;
        let word = name.text.to_ascii_lowercase();
        if !self.check(&TokenKind::LParen)? {
            return Ok(GenericSpec { name: word, kind: GenericKind::Name, span: name.span });
        }
        let (spec_name, kind) = match word.as_str() {
            "operator" => {
                self.expect(TokenKind::LParen)?;
                let token = self.lexer.next_token()?;
                let Some(spelling) = token.kind.operator_spelling() else {
                    return Err(SemaError::parser(format!("expected operator, found {}", token.kind), token.span));
                };
                let kind = operator_kind(&spelling);
                (format!("operator({spelling})"), kind)
            }
            "assignment" => {
                self.expect(TokenKind::LParen)?;
                self.expect(TokenKind::Eq)?;
                ("assignment(=)".to_string(), GenericKind::Assignment)
            }
            "read" | "write" => {
                self.expect(TokenKind::LParen)?;
                let form = self.expect_identifier()?;
                let io = match (word.as_str(), form.text.to_ascii_lowercase().as_str()) {
                    ("read", "formatted") => DefinedIo::ReadFormatted,
                    ("read", "unformatted") => DefinedIo::ReadUnformatted,
                    ("write", "formatted") => DefinedIo::WriteFormatted,
                    ("write", "unformatted") => DefinedIo::WriteUnformatted,
                    (_, other) => {
                        return Err(SemaError::parser(format!("unknown I/O form '{other}'"), form.span));
                    }
                };
                (io.as_source().to_string(), GenericKind::DefinedIo(io))
            }
            _ => return Ok(GenericSpec { name: word, kind: GenericKind::Name, span: name.span }),
        };
        let end = self.expect(TokenKind::RParen)?;
        Ok(GenericSpec { name: spec_name, kind, span: name.span.merge(end.span) })
    }

    fn parse_procedure_decl(&mut self) -> SemaResult<ProcedureDecl> {
        self.expect_word("procedure")?;
        let interface = if self.match_token(&TokenKind::LParen)? {
            let interface = if self.is_type_spec_start()? {
                ProcInterface::Type(self.parse_type_spec()?)
            } else {
                ProcInterface::Name(self.expect_identifier()?)
            };
            self.expect(TokenKind::RParen)?;
            Some(interface)
        } else {
            None
        };
        let mut attrs = Attrs::empty();
        let mut pass_name = None;
        while self.match_token(&TokenKind::Comma)? {
            let attr = self.expect_identifier()?;
            let word = attr.text.to_ascii_lowercase();
            if word == "pass" && self.match_token(&TokenKind::LParen)? {
                pass_name = Some(self.expect_identifier()?);
                self.expect(TokenKind::RParen)?;
                attrs |= Attrs::PASS;
            } else if word == "intent" {
                attrs |= self.parse_intent()?;
            } else if word == "bind" {
                self.parse_bind_spec()?;
                attrs |= Attrs::BIND_C;
            } else if let Some(found) = Attrs::from_keyword(&word) {
                attrs |= found;
            } else {
                return Err(SemaError::parser(format!("unknown attribute '{}'", attr.text), attr.span));
            }
        }
        self.match_token(&TokenKind::ColonColon)?;
        let mut entities = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let target = if self.match_token(&TokenKind::Arrow)? {
                let target = self.expect_identifier()?;
                if self.match_token(&TokenKind::LParen)? {
                    self.expect(TokenKind::RParen)?;
                }
                Some(target)
            } else {
                None
            };
            entities.push(ProcEntityDecl { name, target });
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        Ok(ProcedureDecl { interface, attrs, pass_name, entities })
    }

    fn parse_construct(&mut self, kind: ScopeKind) -> SemaResult<ConstructBlock> {
        let keyword = self.lexer.next_token()?;
        let mut associations = Vec::new();
        if kind == ScopeKind::OtherConstruct {
            self.expect(TokenKind::LParen)?;
            loop {
                let name = self.expect_identifier()?;
                self.expect(TokenKind::Arrow)?;
                let selector = self.parse_selector()?;
                associations.push(Association { name, selector });
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        let body = self.parse_body()?;
        let end = self.last_span_end();
        Ok(ConstructBlock { kind, associations, body, span: Span::new(keyword.span.start, end) })
    }

    fn parse_selector(&mut self) -> SemaResult<Selector> {
        let base = self.expect_identifier()?;
        let mut subscripts = 0;
        if self.match_token(&TokenKind::LParen)? {
            loop {
                self.parse_expr()?;
                subscripts += 1;
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        let mut components = Vec::new();
        while self.match_token(&TokenKind::Percent)? {
            components.push(self.expect_identifier()?);
        }
        Ok(Selector { base, subscripts, components })
    }

    // ==================== Declarations ====================

    fn is_type_spec_start(&mut self) -> SemaResult<bool> {
        let Some(word) = self.peek_word(0)? else {
            return Ok(false);
        };
        Ok(match word.as_str() {
            "type" | "class" => self.check_at(1, &TokenKind::LParen)?,
            "double" => self.check_word_at(1, "precision")?,
            _ => INTRINSIC_TYPE_WORDS.contains(&word.as_str()),
        })
    }

    fn parse_type_spec(&mut self) -> SemaResult<TypeSpec> {
        let keyword = self.expect_identifier()?;
        let word = keyword.text.to_ascii_lowercase();
        match word.as_str() {
            "type" | "class" => {
                let category = if word == "type" { DerivedCategory::Type } else { DerivedCategory::Class };
                self.expect(TokenKind::LParen)?;
                if self.match_token(&TokenKind::Star)? {
                    self.expect(TokenKind::RParen)?;
                    return Ok(TypeSpec::Decl(match category {
                        DerivedCategory::Type => DeclTypeSpec::TypeStar,
                        DerivedCategory::Class => DeclTypeSpec::ClassStar,
                    }));
                }
                let name = self.expect_identifier()?;
                let params = if self.match_token(&TokenKind::LParen)? {
                    self.parse_type_param_values()?
                } else {
                    Vec::new()
                };
                self.expect(TokenKind::RParen)?;
                Ok(TypeSpec::Derived { category, name, params })
            }
            "character" => {
                let mut kind = 1;
                let mut length = ParamValue::Explicit(1);
                if self.match_token(&TokenKind::LParen)? {
                    let mut position = 0;
                    loop {
                        let keyword = if self.check_at(1, &TokenKind::Eq)? {
                            let keyword = self.expect_identifier()?;
                            self.expect(TokenKind::Eq)?;
                            Some(keyword.text.to_ascii_lowercase())
                        } else {
                            None
                        };
                        let value = self.parse_param_value()?;
                        match keyword.as_deref() {
                            Some("kind") => kind = kind_value(value, 1),
                            Some(_) => length = value,
                            None if position == 0 => length = value,
                            None => kind = kind_value(value, 1),
                        }
                        position += 1;
                        if !self.match_token(&TokenKind::Comma)? {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                }
                Ok(TypeSpec::Decl(DeclTypeSpec::Character { kind, length }))
            }
            "doubleprecision" | "double" => {
                if word == "double" {
                    self.expect_word("precision")?;
                }
                Ok(TypeSpec::Decl(DeclTypeSpec::intrinsic(TypeCategory::Real, 8)))
            }
            _ => {
                let Some(category) = TypeCategory::from_keyword(&word) else {
                    return Err(SemaError::parser(format!("expected type, found '{}'", keyword.text), keyword.span));
                };
                let mut kind = DEFAULT_KIND;
                if self.match_token(&TokenKind::LParen)? {
                    if self.check_word("kind")? && self.check_at(1, &TokenKind::Eq)? {
                        self.lexer.next_token()?;
                        self.lexer.next_token()?;
                    }
                    kind = kind_value(self.parse_param_value()?, DEFAULT_KIND);
                    self.expect(TokenKind::RParen)?;
                }
                Ok(TypeSpec::Decl(DeclTypeSpec::intrinsic(category, kind)))
            }
        }
    }

    /// Values after `type(t(`, through the closing parenthesis
    fn parse_type_param_values(&mut self) -> SemaResult<Vec<(Option<Ident>, ParamValue)>> {
        let mut params = Vec::new();
        if self.match_token(&TokenKind::RParen)? {
            return Ok(params);
        }
        loop {
            let keyword = if self.check_at(1, &TokenKind::Eq)? {
                let keyword = self.expect_identifier()?;
                self.expect(TokenKind::Eq)?;
                Some(keyword)
            } else {
                None
            };
            params.push((keyword, self.parse_param_value()?));
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_param_value(&mut self) -> SemaResult<ParamValue> {
        if self.match_token(&TokenKind::Colon)? {
            return Ok(ParamValue::Deferred);
        }
        if self.check(&TokenKind::Star)?
            && (self.check_at(1, &TokenKind::RParen)? || self.check_at(1, &TokenKind::Comma)?)
        {
            self.lexer.next_token()?;
            return Ok(ParamValue::Assumed);
        }
        Ok(match self.parse_expr()? {
            Some(value) => ParamValue::Explicit(value),
            None => ParamValue::NonConstant,
        })
    }

    fn parse_type_decl(&mut self, ty: TypeSpec) -> SemaResult<TypeDecl> {
        let mut attrs = DeclAttrs::default();
        while self.match_token(&TokenKind::Comma)? {
            let attr = self.expect_identifier()?;
            let word = attr.text.to_ascii_lowercase();
            match word.as_str() {
                "intent" => attrs.attrs |= self.parse_intent()?,
                "dimension" => attrs.shape = Some(self.parse_shape_spec()?),
                "codimension" => attrs.corank = Some(self.parse_coshape_spec()?),
                "kind" => attrs.type_param = Some(TypeParamAttr::Kind),
                "len" => attrs.type_param = Some(TypeParamAttr::Len),
                "bind" => {
                    attrs.bind = Some(self.parse_bind_spec()?);
                    attrs.attrs |= Attrs::BIND_C;
                }
                _ => {
                    if let Some(cuda) = CudaDataAttr::from_keyword(&word) {
                        attrs.cuda = Some(cuda);
                    } else if let Some(found) = Attrs::from_keyword(&word) {
                        attrs.attrs |= found;
                    } else {
                        return Err(SemaError::parser(format!("unknown attribute '{}'", attr.text), attr.span));
                    }
                }
            }
        }
        self.expect(TokenKind::ColonColon)?;

        let mut entities = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let shape = if self.check(&TokenKind::LParen)? {
                Some(self.parse_shape_spec()?)
            } else {
                None
            };
            let corank = if self.check(&TokenKind::LBracket)? {
                Some(self.parse_coshape_spec()?)
            } else {
                None
            };
            if self.match_token(&TokenKind::Star)? {
                // character length override
                self.parse_primary()?;
            }
            let init = if self.match_token(&TokenKind::Eq)? {
                Some(Initializer::Value(self.parse_expr()?))
            } else if self.match_token(&TokenKind::Arrow)? {
                self.parse_expr()?;
                Some(Initializer::Pointer)
            } else {
                None
            };
            let storage = if self.match_token(&TokenKind::At)? {
                let offset = self.expect_integer()?;
                self.expect(TokenKind::Colon)?;
                let size = self.expect_integer()?;
                Some((offset, size))
            } else {
                None
            };
            entities.push(EntityDecl { name, shape, corank, init, storage });
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        Ok(TypeDecl { ty, attrs, entities })
    }

    /// `( in | out | inout | in out )` after `intent`
    fn parse_intent(&mut self) -> SemaResult<Attrs> {
        self.expect(TokenKind::LParen)?;
        let intent = self.expect_identifier()?;
        let attr = match intent.text.to_ascii_lowercase().as_str() {
            "in" if self.match_word("out")? => Attrs::INTENT_INOUT,
            "in" => Attrs::INTENT_IN,
            "out" => Attrs::INTENT_OUT,
            "inout" => Attrs::INTENT_INOUT,
            other => return Err(SemaError::parser(format!("unknown intent '{other}'"), intent.span)),
        };
        self.expect(TokenKind::RParen)?;
        Ok(attr)
    }

    fn parse_shape_spec(&mut self) -> SemaResult<ShapeSpec> {
        #[derive(PartialEq)]
        enum Bound {
            Colon,
            Star,
            Extent(Option<i64>),
        }
        self.expect(TokenKind::LParen)?;
        if self.match_token(&TokenKind::DotDot)? {
            self.expect(TokenKind::RParen)?;
            return Ok(ShapeSpec::AssumedRank);
        }
        let mut bounds = Vec::new();
        loop {
            let bound = if self.check(&TokenKind::Colon)? {
                self.lexer.next_token()?;
                Bound::Colon
            } else if self.match_token(&TokenKind::Star)? {
                Bound::Star
            } else {
                let first = self.parse_expr()?;
                if self.match_token(&TokenKind::Colon)? {
                    if self.match_token(&TokenKind::Star)? {
                        Bound::Star
                    } else if self.check(&TokenKind::Comma)? || self.check(&TokenKind::RParen)? {
                        Bound::Colon
                    } else {
                        let upper = self.parse_expr()?;
                        Bound::Extent(first.zip(upper).map(|(lower, upper)| upper - lower + 1))
                    }
                } else {
                    Bound::Extent(first)
                }
            };
            bounds.push(bound);
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        let rank = bounds.len();
        Ok(if bounds.last() == Some(&Bound::Star) {
            ShapeSpec::AssumedSize(rank)
        } else if bounds.iter().all(|bound| *bound == Bound::Colon) {
            ShapeSpec::Colons(rank)
        } else {
            ShapeSpec::Explicit(
                bounds
                    .into_iter()
                    .map(|bound| match bound {
                        Bound::Extent(extent) => extent,
                        Bound::Colon | Bound::Star => None,
                    })
                    .collect(),
            )
        })
    }

    /// Corank of a `[...]` coarray spec
    fn parse_coshape_spec(&mut self) -> SemaResult<usize> {
        self.expect(TokenKind::LBracket)?;
        let mut corank = 0;
        loop {
            if !self.match_token(&TokenKind::Star)? && !self.match_token(&TokenKind::Colon)? {
                self.parse_expr()?;
                if self.match_token(&TokenKind::Colon)? && !self.match_token(&TokenKind::Star)? {
                    self.parse_expr()?;
                }
            }
            corank += 1;
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(corank)
    }

    // ==================== Expressions ====================

    /// Skip an expression, returning its value when it is an integer
    /// constant expression
    fn parse_expr(&mut self) -> SemaResult<Option<i64>> {
        let mut value = self.parse_primary()?;
        loop {
            let op = self.lexer.peek()?.kind.clone();
            let combine: fn(i64, i64) -> Option<i64> = match op {
                TokenKind::Plus => i64::checked_add,
                TokenKind::Minus => i64::checked_sub,
                TokenKind::Star => i64::checked_mul,
                TokenKind::Slash => i64::checked_div,
                TokenKind::StarStar => |base, exp| u32::try_from(exp).ok().and_then(|exp| base.checked_pow(exp)),
                TokenKind::SlashSlash
                | TokenKind::EqEq
                | TokenKind::SlashEq
                | TokenKind::Lt
                | TokenKind::LtEq
                | TokenKind::Gt
                | TokenKind::GtEq
                | TokenKind::Dotted(_) => |_, _| None,
                _ => return Ok(value),
            };
            self.lexer.next_token()?;
            let rhs = self.parse_primary()?;
            value = value.zip(rhs).and_then(|(lhs, rhs)| combine(lhs, rhs));
        }
    }

    fn parse_primary(&mut self) -> SemaResult<Option<i64>> {
        let token = self.lexer.next_token()?;
        match token.kind {
            TokenKind::Plus => self.parse_primary(),
            TokenKind::Minus => Ok(self.parse_primary()?.and_then(i64::checked_neg)),
            TokenKind::Int(digits) => Ok(digits.parse().ok()),
            TokenKind::Real(_) | TokenKind::Str(_) => Ok(None),
            TokenKind::Dotted(op) => {
                if op == ".not." {
                    self.parse_primary()?;
                }
                Ok(None)
            }
            TokenKind::LParen => {
                let value = self.parse_expr()?;
                if self.match_token(&TokenKind::Comma)? {
                    // complex constant
                    self.parse_expr()?;
                    self.expect(TokenKind::RParen)?;
                    return Ok(None);
                }
                self.expect(TokenKind::RParen)?;
                Ok(value)
            }
            TokenKind::LBracket => {
                if !self.check(&TokenKind::RBracket)? {
                    loop {
                        self.parse_expr()?;
                        if !self.match_token(&TokenKind::Comma)? {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(None)
            }
            TokenKind::Ident(_) => {
                loop {
                    if self.check(&TokenKind::LParen)? {
                        self.skip_balanced()?;
                    } else if self.match_token(&TokenKind::Percent)? {
                        self.expect_identifier()?;
                    } else {
                        break;
                    }
                }
                Ok(None)
            }
            other => Err(SemaError::parser(format!("expected expression, found {other}"), token.span)),
        }
    }

    /// Skip a parenthesized argument list
    fn skip_balanced(&mut self) -> SemaResult<()> {
        self.expect(TokenKind::LParen)?;
        let mut depth = 1;
        while depth > 0 {
            let token = self.lexer.next_token()?;
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                TokenKind::Eof => {
                    return Err(SemaError::parser("unbalanced parentheses", token.span));
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ==================== Helpers ====================

    fn skip_separators(&mut self) -> SemaResult<()> {
        while self.match_token(&TokenKind::Semicolon)? {}
        Ok(())
    }

    fn last_span_end(&mut self) -> usize {
        self.lexer.peek().map_or(0, |token| token.span.start)
    }

    fn check(&mut self, expected: &TokenKind) -> SemaResult<bool> {
        self.lexer.check(expected)
    }

    fn check_at(&mut self, n: usize, expected: &TokenKind) -> SemaResult<bool> {
        Ok(mem::discriminant(&self.lexer.peek_at(n)?.kind) == mem::discriminant(expected))
    }

    fn match_token(&mut self, expected: &TokenKind) -> SemaResult<bool> {
        self.lexer.match_token(expected)
    }

    fn expect(&mut self, expected: TokenKind) -> SemaResult<Token> {
        self.lexer.expect(expected)
    }

    /// Lower-case text of the word `n` tokens ahead
    fn peek_word(&mut self, n: usize) -> SemaResult<Option<String>> {
        Ok(word_of(self.lexer.peek_at(n)?))
    }

    fn check_word(&mut self, keyword: &str) -> SemaResult<bool> {
        Ok(self.lexer.peek()?.is_word(keyword))
    }

    fn check_word_at(&mut self, n: usize, keyword: &str) -> SemaResult<bool> {
        Ok(self.lexer.peek_at(n)?.is_word(keyword))
    }

    fn match_word(&mut self, keyword: &str) -> SemaResult<bool> {
        if self.check_word(keyword)? {
            self.lexer.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_word(&mut self, keyword: &str) -> SemaResult<Token> {
        let token = self.lexer.next_token()?;
        if token.is_word(keyword) {
            Ok(token)
        } else {
            Err(SemaError::parser(format!("expected '{keyword}', found {}", token.kind), token.span))
        }
    }

    fn expect_identifier(&mut self) -> SemaResult<Ident> {
        let token = self.lexer.next_token()?;
        match token.kind {
            TokenKind::Ident(name) => Ok(Ident::new(name, token.span)),
            other => Err(SemaError::parser(format!("expected identifier, found {other}"), token.span)),
        }
    }

    fn expect_integer(&mut self) -> SemaResult<usize> {
        let token = self.lexer.next_token()?;
        match &token.kind {
            TokenKind::Int(digits) => digits
                .parse()
                .map_err(|_| SemaError::parser(format!("integer '{digits}' is out of range"), token.span)),
            other => Err(SemaError::parser(format!("expected integer, found {other}"), token.span)),
        }
    }
}

fn word_of(token: &Token) -> Option<String> {
    match &token.kind {
        TokenKind::Ident(word) => Some(word.to_ascii_lowercase()),
        _ => None,
    }
}

fn kind_value(value: ParamValue, default: u8) -> u8 {
    value
        .constant()
        .and_then(|kind| u8::try_from(kind).ok())
        .unwrap_or(default)
}

fn operator_kind(spelling: &str) -> GenericKind {
    if let Some(op) = RelationalOperator::from_source(spelling) {
        GenericKind::Relational(op)
    } else if let Some(op) = LogicalOperator::from_source(spelling) {
        GenericKind::Logical(op)
    } else if spelling == "//" {
        GenericKind::Concatenate
    } else if spelling.starts_with('.') {
        GenericKind::DefinedOperator
    } else {
        GenericKind::Numeric
    }
}

/// Parse a source file
pub fn parse(source: &str) -> SemaResult<SourceFile> {
    Parser::new(source).parse_file()
}
