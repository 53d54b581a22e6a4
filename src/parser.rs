// src/parser.rs
//
// SWC parse / print for route files. Synthesised snippets are parsed into the
// same SourceMap as the file itself so spans never collide when printing.

use swc_common::{comments::SingleThreadedComments, sync::Lrc, FileName, SourceMap, Spanned};
use swc_ecma_ast::{Expr, JSXElement, Module, ModuleItem, Stmt};
use swc_ecma_codegen::{text_writer::JsWriter, Config, Emitter};
use swc_ecma_parser::{lexer::Lexer, Parser as SwcParser, StringInput, Syntax, TsConfig};

use crate::error::TransformError;

/// A parsed route file plus everything needed to print it back.
pub struct SourceUnit {
    cm: Lrc<SourceMap>,
    comments: SingleThreadedComments,
    pub module: Module,
}

impl SourceUnit {
    /// Parse `src`. `file_name` picks the syntax: `.ts` files are parsed without
    /// JSX, everything else as TSX.
    pub fn parse(file_name: &str, src: &str) -> Result<Self, TransformError> {
        let cm: Lrc<SourceMap> = Default::default();
        let comments = SingleThreadedComments::default();
        let module = parse_into(&cm, Some(&comments), file_name, src)?;
        Ok(Self { cm, comments, module })
    }

    /// Parse a generated snippet into module items.
    pub fn parse_items(&self, snippet: &str) -> Result<Vec<ModuleItem>, TransformError> {
        Ok(parse_into(&self.cm, None, "<generated>.tsx", snippet)?.body)
    }

    /// Parse a generated snippet consisting of exactly one statement.
    pub fn parse_stmt(&self, snippet: &str) -> Result<Stmt, TransformError> {
        match self.parse_items(snippet)?.into_iter().next() {
            Some(ModuleItem::Stmt(stmt)) => Ok(stmt),
            _ => Err(TransformError::UnexpectedShape(format!(
                "generated snippet is not a statement: {snippet}"
            ))),
        }
    }

    /// Parse a JSX element such as `<Scripts />`.
    pub fn parse_jsx(&self, snippet: &str) -> Result<Box<JSXElement>, TransformError> {
        let stmt = self.parse_stmt(&format!("({snippet});"))?;
        if let Stmt::Expr(expr_stmt) = stmt {
            let mut expr = *expr_stmt.expr;
            while let Expr::Paren(paren) = expr {
                expr = *paren.expr;
            }
            if let Expr::JSXElement(element) = expr {
                return Ok(element);
            }
        }
        Err(TransformError::UnexpectedShape(format!(
            "generated snippet is not a JSX element: {snippet}"
        )))
    }

    /// Print the (possibly rewritten) module back to source text.
    pub fn print(&self) -> Result<String, TransformError> {
        let mut buf = Vec::new();
        {
            let wr = JsWriter::new(self.cm.clone(), "\n", &mut buf, None);
            let mut emitter = Emitter {
                cfg: Config::default(),
                cm: self.cm.clone(),
                comments: Some(&self.comments),
                wr,
            };
            emitter.emit_module(&self.module)?;
        }
        String::from_utf8(buf).map_err(|e| {
            TransformError::UnexpectedShape(format!("printer produced invalid UTF-8: {e}"))
        })
    }
}

fn parse_into(
    cm: &Lrc<SourceMap>,
    comments: Option<&SingleThreadedComments>,
    file_name: &str,
    src: &str,
) -> Result<Module, TransformError> {
    let fm = cm.new_source_file(FileName::Custom(file_name.to_string()), src.to_string());

    // .ts cannot contain JSX and `<T>(x) => x` would be ambiguous as TSX
    let syntax = Syntax::Typescript(TsConfig {
        tsx: !file_name.ends_with(".ts"),
        decorators: true,
        no_early_errors: true,
        ..Default::default()
    });

    let lexer = Lexer::new(
        syntax,
        Default::default(),
        StringInput::from(&*fm),
        comments.map(|c| c as &dyn swc_common::comments::Comments),
    );
    let mut parser = SwcParser::new_from(lexer);

    let to_error = |e: swc_ecma_parser::error::Error| TransformError::Parse {
        line: cm.lookup_char_pos(e.span().lo).line,
        message: e.kind().msg().to_string(),
    };

    let module = parser.parse_module().map_err(to_error)?;
    if let Some(recovered) = parser.take_errors().into_iter().next() {
        return Err(to_error(recovered));
    }
    Ok(module)
}
