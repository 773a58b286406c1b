#![no_main]

use formdec::{DecodeLimits, MultipartDecoder, UploadedFile};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let limits = DecodeLimits::new().max_file_size(4096).max_file_count(4).max_field_size(4096);
    let decoder = MultipartDecoder::new(limits).with_read_size(7);

    if let Ok(form) = decoder.decode(data, "multipart/form-data; boundary=X-BOUNDARY", None) {
        let files: Vec<UploadedFile> = form.files().into_iter().cloned().collect();
        for file in files {
            let _ = file.remove();
        }
    }
});
