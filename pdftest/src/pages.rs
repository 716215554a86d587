use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::debug;

use crate::library::{Document, FormFill, PageAction, PageResolver};

/// A document's form environment together with the pages it has opened.
///
/// Pages are registered before their form hooks run, so a hook asking for
/// the page being opened gets that page back instead of loading it again.
/// Fields drop in declaration order: pages, then the form, then the borrow of
/// the document.
pub struct FormSession<'d, D: Document> {
    loaded_pages: RefCell<BTreeMap<usize, Rc<D::Page>>>,
    form: D::Form,
    document: &'d D,
}

impl<'d, D: Document> FormSession<'d, D> {
    pub fn new(document: &'d D) -> Self {
        FormSession {
            loaded_pages: RefCell::new(BTreeMap::new()),
            form: document.init_form_fill(),
            document,
        }
    }

    pub fn form(&self) -> &D::Form {
        &self.form
    }

    pub fn document(&self) -> &'d D {
        self.document
    }

    pub fn loaded_page_count(&self) -> usize {
        self.loaded_pages.borrow().len()
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.loaded_pages.borrow().contains_key(&index)
    }
}

impl<D: Document> PageResolver<D::Page> for FormSession<'_, D> {
    fn page_for_index(&self, index: usize) -> Option<Rc<D::Page>> {
        let cached = self.loaded_pages.borrow().get(&index).cloned();
        if let Some(page) = cached {
            return Some(page);
        }

        let page = Rc::new(self.document.load_page(index)?);
        debug!("loaded page {}", index);
        self.loaded_pages
            .borrow_mut()
            .insert(index, Rc::clone(&page));
        self.form.on_after_load_page(&page, self);
        self.form.do_page_action(&page, PageAction::Open, self);
        Some(page)
    }
}
