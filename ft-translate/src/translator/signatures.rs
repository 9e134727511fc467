use tracing::debug;

use super::grammar::{Declaration, FunctionHead, Statement, classify};
use super::lines::SourceLine;
use super::symbols::ScalarType;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum ParamShape {
    Scalar,
    Vector,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct FunctionSignature {
    pub(super) name: String,
    pub(super) param: String,
    pub(super) param_shape: ParamShape,
    pub(super) param_type: ScalarType,
    pub(super) result: String,
    pub(super) result_type: ScalarType,
    /// Whether the body declares the result variable itself.
    pub(super) result_declared: bool,
    pub(super) line: usize,
}

impl FunctionSignature {
    pub(super) fn from_head(head: &FunctionHead, line: usize) -> Self {
        Self {
            name: head.name.clone(),
            param: head.param.clone(),
            param_shape: ParamShape::Scalar,
            param_type: ScalarType::Int,
            result: head.result.clone().unwrap_or_else(|| head.name.clone()),
            result_type: head.prefix_type.unwrap_or(ScalarType::Int),
            result_declared: false,
            line,
        }
    }

    pub(super) fn header(&self) -> String {
        let param = match self.param_shape {
            ParamShape::Scalar => format!("{} {}", self.param_type.cpp_name(), self.param),
            ParamShape::Vector => format!(
                "const vector<{}>& {}",
                self.param_type.cpp_name(),
                self.param
            ),
        };
        format!("{} {}({param}) {{", self.result_type.cpp_name(), self.name)
    }

    fn absorb(&mut self, decl: &Declaration) {
        for item in &decl.items {
            if item.name.eq_ignore_ascii_case(&self.param) {
                self.param_type = decl.ty;
                if item.effective_shape(decl) == Some(":") {
                    self.param_shape = ParamShape::Vector;
                }
            } else if item.name.eq_ignore_ascii_case(&self.result) {
                self.result_type = decl.ty;
                self.result_declared = true;
            }
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Outline {
    Function,
    Other,
}

/// First pass: reads every function's parameter shape and types so that the
/// second pass can emit complete headers without patching earlier output.
///
/// Nesting problems are ignored here; the second pass reports them.
pub(super) fn collect_signatures(lines: &[SourceLine]) -> Vec<FunctionSignature> {
    let mut signatures = Vec::new();
    let mut current: Option<FunctionSignature> = None;
    let mut outline: Vec<Outline> = Vec::new();

    for line in lines {
        if line.code.is_empty() {
            continue;
        }
        match classify(&line.code) {
            Statement::FunctionOpen(head) => {
                if let Some(done) = current.take() {
                    signatures.push(done);
                }
                current = Some(FunctionSignature::from_head(&head, line.number));
                outline.push(Outline::Function);
            }
            Statement::ModuleOpen(_)
            | Statement::ProgramOpen(_)
            | Statement::DoLoop { .. }
            | Statement::DoWhile(_) => outline.push(Outline::Other),
            Statement::FunctionEnd => {
                close_function(&mut outline, &mut current, &mut signatures);
            }
            Statement::End if outline.last() == Some(&Outline::Function) => {
                close_function(&mut outline, &mut current, &mut signatures);
            }
            Statement::ModuleEnd
            | Statement::ProgramEnd
            | Statement::EndDo
            | Statement::End => {
                outline.pop();
            }
            Statement::Declaration(decl) => {
                if let Some(signature) = current.as_mut() {
                    signature.absorb(&decl);
                }
            }
            _ => {}
        }
    }

    signatures.extend(current);
    for signature in &signatures {
        debug!("signature (line {}): {}", signature.line, signature.header());
    }
    signatures
}

fn close_function(
    outline: &mut Vec<Outline>,
    current: &mut Option<FunctionSignature>,
    signatures: &mut Vec<FunctionSignature>,
) {
    outline.pop();
    if let Some(done) = current.take() {
        signatures.push(done);
    }
}

#[cfg(test)]
mod tests {
    use super::{ParamShape, collect_signatures};
    use crate::translator::lines::logical_lines;
    use crate::translator::symbols::ScalarType;

    #[test]
    fn scalar_parameter_header() {
        let source = "\
module m
contains
  pure integer function factorial(n) result(nfac)
    integer, intent(in) :: n
    integer :: i
    nfac = 1
  end function factorial
end module m
";
        let signatures = collect_signatures(&logical_lines(source));
        assert_eq!(signatures.len(), 1);
        assert_eq!(signatures[0].header(), "int factorial(int n) {");
        assert_eq!(signatures[0].result, "nfac");
        assert!(!signatures[0].result_declared);
        assert_eq!(signatures[0].line, 3);
    }

    #[test]
    fn vector_parameter_header() {
        let source = "\
function total(x) result(s)
  real(kind=8), intent(in) :: x(:)
  real(kind=8) :: s
  s = 0
end function
";
        let signatures = collect_signatures(&logical_lines(source));
        assert_eq!(signatures[0].param_shape, ParamShape::Vector);
        assert_eq!(signatures[0].param_type, ScalarType::Double);
        assert!(signatures[0].result_declared);
        assert_eq!(
            signatures[0].header(),
            "double total(const vector<double>& x) {"
        );
    }

    #[test]
    fn lone_end_closes_the_function_not_its_loops() {
        let source = "\
integer function f(n)
  do i = 1, n
  end
  integer, intent(in) :: n
end
integer function g(v)
  integer, dimension(:) :: v
end
";
        let signatures = collect_signatures(&logical_lines(source));
        assert_eq!(signatures.len(), 2);
        assert_eq!(signatures[0].name, "f");
        assert_eq!(signatures[0].param_shape, ParamShape::Scalar);
        assert_eq!(signatures[0].result, "f");
        assert_eq!(signatures[1].header(), "int g(const vector<int>& v) {");
    }
}
