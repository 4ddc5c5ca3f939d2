use std::collections::HashSet;
use std::sync::LazyLock;

const HTML_TAGS: &str = "html,body,base,head,link,meta,style,title,\
address,article,aside,footer,header,h1,h2,h3,h4,h5,h6,hgroup,nav,section,\
div,dd,dl,dt,figcaption,figure,picture,hr,img,li,main,ol,p,pre,ul,\
a,b,abbr,bdi,bdo,br,cite,code,data,dfn,em,i,kbd,mark,q,rp,rt,rtc,ruby,\
s,samp,small,span,strong,sub,sup,time,u,var,wbr,area,audio,map,track,video,\
embed,object,param,source,canvas,script,noscript,del,ins,\
caption,col,colgroup,table,thead,tbody,td,th,tr,\
button,datalist,fieldset,form,input,label,legend,meter,optgroup,option,\
output,progress,select,textarea,\
details,dialog,menu,menuitem,summary,\
content,element,shadow,template,blockquote,iframe,tfoot";

const SVG_TAGS: &str = "svg,animate,circle,clippath,cursor,defs,desc,ellipse,filter,font-face,\
foreignobject,g,glyph,image,line,marker,mask,missing-glyph,path,pattern,\
polygon,polyline,rect,switch,symbol,text,textpath,tspan,use,view";

const VOID_TAGS: &str = "area,base,br,col,embed,hr,img,input,link,meta,param,source,track,wbr";

fn set(list: &'static str) -> HashSet<&'static str> {
    list.split(',').collect()
}

static HTML: LazyLock<HashSet<&'static str>> = LazyLock::new(|| set(HTML_TAGS));
static SVG: LazyLock<HashSet<&'static str>> = LazyLock::new(|| set(SVG_TAGS));
static VOID: LazyLock<HashSet<&'static str>> = LazyLock::new(|| set(VOID_TAGS));

/// Case-sensitive: `Div` is a component, `div` is not.
pub fn is_html_tag(tag: &str) -> bool {
    HTML.contains(tag)
}

pub fn is_svg_tag(tag: &str) -> bool {
    SVG.contains(tag.to_ascii_lowercase().as_str())
}

/// Standard tags render as DOM elements; everything else is a component.
pub fn is_reserved_tag(tag: &str) -> bool {
    is_html_tag(tag) || is_svg_tag(tag)
}

pub fn is_void_tag(tag: &str) -> bool {
    VOID.contains(tag)
}
