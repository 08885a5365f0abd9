/// Constants used throughout the askdocs application
/// This module centralizes all constant values for better maintainability

/// Directory names that are skipped when walking a document folder
/// These are version control internals, build output, and caches that
/// never contain documents worth answering questions about
pub const SKIP_DIRECTORIES: &[&str] = &[
    // Version control systems
    ".git",
    ".hg",           // Mercurial
    ".svn",          // Subversion
    ".bzr",          // Bazaar
    // Build artifacts and dependencies
    "node_modules",
    "target",        // Rust
    "dist",
    "build",
    "venv",          // Python virtual environment
    ".venv",
    "__pycache__",
    ".pytest_cache",
    // Caches
    ".cache",
    ".DS_Store",
];

/// Prompt asking the LLM to pick and score the passages relevant to a question.
/// Placeholders: {context} (numbered passage list), {question}
pub const CHOICE_SELECT_PROMPT: &str = "\
A list of documents is shown below. Each document has a number next to it \
along with a summary of the document. A question is also provided.
Respond with the numbers of the documents you should consult to answer the \
question, in order of relevance, as well as the relevance score. The \
relevance score is a number from 1-10 based on how relevant you think the \
document is to the question.
Do not include any documents that are not relevant to the question.
Example format:
Document 1:
<summary of document 1>

Document 2:
<summary of document 2>

...

Document 10:
<summary of document 10>

Question: <question>
Answer:
Doc: 9, Relevance: 7
Doc: 3, Relevance: 4
Doc: 7, Relevance: 3

Let's try this now:

{context}
Question: {question}
Answer:
";

/// Prompt for answering a question from retrieved context only.
/// Placeholders: {context}, {question}
pub const TEXT_QA_PROMPT: &str = "\
Context information is below.
---------------------
{context}
---------------------
Given the context information and not prior knowledge, answer the query.
Query: {question}
Answer: ";

/// Prompt for refining an existing answer with additional context.
/// Placeholders: {question}, {answer}, {context}
pub const REFINE_PROMPT: &str = "\
The original query is as follows: {question}
We have provided an existing answer: {answer}
We have the opportunity to refine the existing answer (only if needed) with \
some more context below.
------------
{context}
------------
Given the new context, refine the original answer to better answer the \
query. If the context isn't useful, return the original answer.
Refined Answer: ";
