use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "simple_lowercase";

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    let _url_field = schema_builder.add_text_field("url", STRING | STORED);
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let options = TextOptions::default().set_indexing_options(indexing).set_stored();
    let _title_field = schema_builder.add_text_field("title", options.clone());
    let _text_field = schema_builder.add_text_field("text", options);
    schema_builder.build()
}

/// Lowercasing only. Stopwords stay in the index; BM25 already
/// downweights high-frequency terms.
pub fn register_tokenizer(index: &Index) {
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build();
    index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
