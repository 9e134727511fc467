mod report;

use serde::Serialize;

use crate::report::{TranslateReport, translate_report};

#[derive(Serialize)]
struct TranslateResponse {
    output: Option<String>,
    diagnostics: Vec<ResponseDiagnostic>,
}

#[derive(Serialize)]
struct ResponseDiagnostic {
    line: usize,
    message: String,
    severity: &'static str,
}

const EMPTY_RESPONSE: &[u8] = b"{\"output\":null,\"diagnostics\":[]}";

/// Byte region shared with the host, addressed in wasm32 linear memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct HostSlice {
    ptr: u32,
    len: u32,
}

impl HostSlice {
    /// `(len << 32) | ptr`, the shape returned across the export boundary.
    fn packed(self) -> u64 {
        (u64::from(self.len) << 32) | u64::from(self.ptr)
    }

    /// Hands `bytes` to the host; it is released through `wasm_dealloc`.
    fn leak(bytes: Vec<u8>) -> Self {
        let leaked: &'static mut [u8] = Box::leak(bytes.into_boxed_slice());
        Self {
            ptr: leaked.as_mut_ptr() as usize as u32,
            len: leaked.len() as u32,
        }
    }

    /// Null or empty regions read as no bytes.
    ///
    /// # Safety
    /// A non-empty region must point at `len` initialized bytes the host
    /// keeps alive for `'a`.
    unsafe fn bytes<'a>(self) -> &'a [u8] {
        if self.ptr == 0 || self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr as usize as *const u8, self.len as usize) }
    }
}

fn response_for(report: TranslateReport) -> TranslateResponse {
    TranslateResponse {
        output: report.output,
        diagnostics: report
            .diagnostics
            .into_iter()
            .map(|item| ResponseDiagnostic {
                line: item.line,
                message: item.message,
                severity: item.severity.as_str(),
            })
            .collect(),
    }
}

fn translate_to_json(source_bytes: &[u8]) -> Vec<u8> {
    let response = match std::str::from_utf8(source_bytes) {
        Ok(source) => response_for(translate_report(source)),
        Err(err) => TranslateResponse {
            output: None,
            diagnostics: vec![ResponseDiagnostic {
                line: 1,
                message: format!("invalid utf-8 source: {err}"),
                severity: "error",
            }],
        },
    };
    serde_json::to_vec(&response).unwrap_or_else(|_| EMPTY_RESPONSE.to_vec())
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_alloc(len: u32) -> *mut u8 {
    std::mem::ManuallyDrop::new(Vec::<u8>::with_capacity(len as usize)).as_mut_ptr()
}

#[unsafe(no_mangle)]
pub extern "C" fn wasm_dealloc(ptr: u32, len: u32) {
    if ptr == 0 || len == 0 {
        return;
    }
    // SAFETY: the host only frees regions it got from `wasm_alloc` or from
    // `translate_source_json`, both `len` bytes of capacity.
    drop(unsafe { Vec::from_raw_parts(ptr as usize as *mut u8, len as usize, len as usize) });
}

/// Translates the UTF-8 source at `source_ptr` and returns the JSON response
/// as a packed `(len << 32) | ptr`; release it with `wasm_dealloc`.
#[unsafe(no_mangle)]
pub extern "C" fn translate_source_json(source_ptr: u32, source_len: u32) -> u64 {
    let input = HostSlice {
        ptr: source_ptr,
        len: source_len,
    };
    // SAFETY: the host passes a region it wrote through `wasm_alloc`.
    let source = unsafe { input.bytes() };
    HostSlice::leak(translate_to_json(source)).packed()
}

#[cfg(test)]
mod tests {
    use super::{HostSlice, translate_to_json};

    fn json(source: &[u8]) -> serde_json::Value {
        serde_json::from_slice(&translate_to_json(source)).expect("response should be json")
    }

    #[test]
    fn response_carries_output_and_warnings() {
        let value = json(include_bytes!("../../samples/script.f90"));
        let output = value["output"].as_str().expect("output should be a string");
        assert!(output.contains("int main() {"));
        let diagnostics = value["diagnostics"]
            .as_array()
            .expect("diagnostics should be an array");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0]["severity"], "warning");
    }

    #[test]
    fn response_reports_nesting_errors() {
        let value = json(b"module m\nend do\n");
        assert!(value["output"].is_null());
        assert_eq!(value["diagnostics"][0]["severity"], "error");
        assert_eq!(value["diagnostics"][0]["line"], 2);
    }

    #[test]
    fn response_rejects_invalid_utf8() {
        let value = json(&[0x66, 0xff, 0x0a]);
        assert!(value["output"].is_null());
        assert!(
            value["diagnostics"][0]["message"]
                .as_str()
                .is_some_and(|message| message.starts_with("invalid utf-8 source"))
        );
    }

    #[test]
    fn host_slice_packs_length_above_pointer() {
        let slice = HostSlice { ptr: 0x10, len: 3 };
        assert_eq!(slice.packed(), (3u64 << 32) | 0x10);
    }

    #[test]
    fn empty_host_slice_reads_nothing() {
        let slice = HostSlice { ptr: 0, len: 8 };
        assert!(unsafe { slice.bytes() }.is_empty());
    }
}
