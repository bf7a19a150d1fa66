#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(doc) = docmodel::xml_parse_document(s) else {
        return;
    };
    // anything that parses must survive export unchanged
    let exported = docmodel::xml_export(&doc.root, &doc.root_tag, true, None);
    match docmodel::xml_parse_document(&exported) {
        Ok(reparsed) => assert_eq!(reparsed, doc),
        Err(err) => panic!("re-export failed to parse: {err}\n{exported}"),
    }
});
